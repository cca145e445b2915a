//! Gateway constants
//!
//! Centralized location for the endpoints and defaults used when talking to
//! the payment gateway.

// Base URLs
pub const DEFAULT_API_BASE_URL: &str = "https://api.mercadopago.com";
pub const DEFAULT_AUTH_BASE_URL: &str = "https://auth.mercadopago.com";

// REST endpoints (relative to the API base)
pub const TOKEN_ENDPOINT: &str = "/oauth/token";
pub const AUTHORIZATION_ENDPOINT: &str = "/authorization";
pub const PAYMENT_ENDPOINT: &str = "/v1/payments";
pub const PAYMENT_METHODS_ENDPOINT: &str = "/v1/payment_methods";
pub const FINANCIAL_INSTITUTIONS_ENDPOINT: &str = "/v1/payment_methods/card_issuers";
pub const IDENTIFICATION_TYPES_ENDPOINT: &str = "/v1/identification_types";
pub const PREFERENCE_ENDPOINT: &str = "/checkout/preferences";

// Request headers
pub const IDEMPOTENCY_KEY_HEADER: &str = "X-Idempotency-Key";

// Bank-debit (PSE) payment method
pub const PSE_PAYMENT_METHOD_ID: &str = "pse";

// Token lifecycle defaults
pub const DEFAULT_REFRESH_SKEW_SECS: u64 = 300;
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Authorization attempts (state -> verifier)
pub const DEFAULT_STATE_TTL_SECS: u64 = 600;
pub const DEFAULT_STATE_MAX_CAPACITY: u64 = 10_000;

// Environment variable names
pub const ENV_CLIENT_ID: &str = "MERCADOPAGO_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "MERCADOPAGO_CLIENT_SECRET";
pub const ENV_STATE_SIGNING_KEY: &str = "MERCADOPAGO_STATE_SIGNING_KEY";
