use std::sync::Arc;

use mpauth_common::auth::AccessTokenProvider;
use mpauth_domain::constants::{
    FINANCIAL_INSTITUTIONS_ENDPOINT, IDEMPOTENCY_KEY_HEADER, PAYMENT_ENDPOINT,
    PAYMENT_METHODS_ENDPOINT, PSE_PAYMENT_METHOD_ID,
};
use mpauth_domain::{
    CardPaymentRequest, FinancialInstitution, GatewayError, PaymentMethod, PaymentResponse,
    PsePaymentRequest, Result,
};
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::InfraError;
use crate::http::HttpClient;

/// Client for the gateway's payment endpoints, acting on behalf of one
/// merchant per call.
pub struct PaymentClient<P: AccessTokenProvider + ?Sized> {
    http: HttpClient,
    api_base_url: String,
    tokens: Arc<P>,
}

impl<P: AccessTokenProvider + ?Sized> PaymentClient<P> {
    /// Client for `api_base_url`, taking tokens from `tokens`
    pub fn new(http: HttpClient, api_base_url: impl Into<String>, tokens: Arc<P>) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        Self { http, api_base_url, tokens }
    }

    /// Payment methods available to the merchant.
    ///
    /// An empty success body yields an empty list.
    pub async fn list_payment_methods(&self, user_id: &str) -> Result<Vec<PaymentMethod>> {
        let builder = self.authorized(Method::GET, PAYMENT_METHODS_ENDPOINT, user_id).await?;
        self.fetch_list(builder, "payment methods").await
    }

    /// Banks that accept PSE bank-debit payments.
    pub async fn list_pse_banks(&self, user_id: &str) -> Result<Vec<FinancialInstitution>> {
        let builder = self
            .authorized(Method::GET, FINANCIAL_INSTITUTIONS_ENDPOINT, user_id)
            .await?
            .query(&[("payment_method_id", PSE_PAYMENT_METHOD_ID)]);
        self.fetch_list(builder, "PSE banks").await
    }

    /// Charge a tokenized card; `request.token` comes from the client-side SDK.
    pub async fn create_card_payment(
        &self,
        user_id: &str,
        request: &CardPaymentRequest,
    ) -> Result<PaymentResponse> {
        self.create_payment(user_id, request, "card").await
    }

    /// Create a PSE payment. The response's `external_resource_url` is where
    /// the payer must be redirected to complete the debit.
    pub async fn create_pse_payment(
        &self,
        user_id: &str,
        request: &PsePaymentRequest,
    ) -> Result<PaymentResponse> {
        self.create_payment(user_id, request, "pse").await
    }

    async fn create_payment<B: Serialize + ?Sized>(
        &self,
        user_id: &str,
        body: &B,
        kind: &'static str,
    ) -> Result<PaymentResponse> {
        let idempotency_key = Uuid::new_v4().to_string();
        let builder = self
            .authorized(Method::POST, PAYMENT_ENDPOINT, user_id)
            .await?
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.as_str())
            .json(body);

        let (status, text) = self.execute(builder).await?;
        if !status.is_success() || text.trim().is_empty() {
            warn!(user_id = %user_id, kind, status = status.as_u16(), "payment rejected");
            return Err(GatewayError::Remote { status: status.as_u16(), body: text });
        }

        let payment: PaymentResponse = decode(&text)?;
        info!(
            user_id = %user_id,
            kind,
            payment_id = payment.id,
            status = payment.status.as_deref().unwrap_or("unknown"),
            "payment created"
        );
        Ok(payment)
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &'static str,
    ) -> Result<Vec<T>> {
        let (status, text) = self.execute(builder).await?;
        if !status.is_success() {
            warn!(what, status = status.as_u16(), "gateway list request failed");
            return Err(GatewayError::Remote { status: status.as_u16(), body: text });
        }

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let items: Vec<T> = decode(&text)?;
        debug!(what, count = items.len(), "gateway list fetched");
        Ok(items)
    }

    async fn authorized(
        &self,
        method: Method,
        path: &str,
        user_id: &str,
    ) -> Result<RequestBuilder> {
        let access_token = self.tokens.access_token(user_id).await.map_err(InfraError::from)?;

        Ok(self
            .http
            .request(method, format!("{}{}", self.api_base_url, path))
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json"))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<(reqwest::StatusCode, String)> {
        let response = self.http.send(builder).await?;
        let status = response.status();
        let text = response.text().await.map_err(InfraError::from)?;
        Ok((status, text))
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| GatewayError::Decode(format!("{e} (body: {text})")))
}

impl<P: AccessTokenProvider + ?Sized> std::fmt::Debug for PaymentClient<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentClient").field("api_base_url", &self.api_base_url).finish()
    }
}
