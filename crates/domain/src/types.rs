//! Payment gateway request and response models
//!
//! Request bodies are serialized exactly as the gateway expects them; the
//! payment client performs no field mapping of its own.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A payment method offered by the gateway (e.g. `visa`, `pse`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentMethod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_institutions: Option<Vec<FinancialInstitution>>,
}

/// A bank available for bank-debit (PSE) payments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinancialInstitution {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Identification document of the payer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identification {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payer {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// `individual` or `association`; required for PSE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// Usually `customer`; required for PSE
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub identification: Identification,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdditionalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Card payment using a card token produced client-side
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardPaymentRequest {
    pub transaction_amount: f64,
    pub token: String,
    pub description: String,
    pub installments: u32,
    pub payment_method_id: String,
    pub issuer_id: String,
    pub payer: Payer,
    pub notification_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<AdditionalInfo>,
}

/// Bank-debit redirect payment; `issuer_id` is the chosen financial institution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PsePaymentRequest {
    pub transaction_amount: f64,
    pub description: String,
    pub payment_method_id: String,
    pub payer: Payer,
    pub issuer_id: String,
    pub callback_url: String,
    pub notification_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<AdditionalInfo>,
}

/// Gateway answer to a payment creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentResponse {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub transaction_amount: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub payment_type_id: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub date_approved: Option<DateTime<FixedOffset>>,
    /// Bank redirect for PSE payments
    #[serde(default)]
    pub external_resource_url: Option<String>,
}
