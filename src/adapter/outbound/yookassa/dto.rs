//! Request and response bodies for the payments API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentBody {
    pub amount: Amount,
    pub confirmation: ConfirmationRequest,
    pub capture: bool,
    pub description: String,
    pub metadata: Metadata,
    pub receipt: Receipt,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub return_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub payment_db_id: i32,
    pub tariff: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub customer: Customer,
    pub items: Vec<ReceiptItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_system_code: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptItem {
    pub description: String,
    pub quantity: String,
    pub amount: Amount,
    pub vat_code: u8,
    pub payment_mode: &'static str,
    pub payment_subject: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentBody {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub confirmation: Option<ConfirmationBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationBody {
    #[serde(default)]
    pub confirmation_url: Option<String>,
}

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ErrorBody {
    #[must_use]
    pub fn summary(&self) -> String {
        match (&self.code, &self.description) {
            (Some(code), Some(description)) => format!("{code}: {description}"),
            (Some(code), None) => code.clone(),
            (None, Some(description)) => description.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}
