//! REST client for redirect checkouts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use super::dto::{
    Amount, ConfirmationRequest, CreatePaymentBody, Customer, ErrorBody, Metadata, PaymentBody,
    Receipt, ReceiptItem,
};
use crate::domain::payment::PaymentStatus;
use crate::error::PaymentError;
use crate::port::outbound::billing::{CheckoutRequest, PaymentProvider, ProviderPayment};

pub const DEFAULT_API_URL: &str = "https://api.yookassa.ru/v3";

/// Fiscal receipt fields attached to every checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptSettings {
    pub customer_email: String,
    /// 1 means "no VAT".
    pub vat_code: u8,
    pub tax_system_code: Option<u8>,
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        Self {
            customer_email: "user@example.com".to_string(),
            vat_code: 1,
            tax_system_code: None,
        }
    }
}

/// Creates and fetches payments with HTTP basic auth (`shop_id:api_key`).
#[derive(Debug, Clone)]
pub struct YooKassaClient {
    client: Client,
    api_url: String,
    shop_id: String,
    api_key: String,
    receipt: ReceiptSettings,
}

impl YooKassaClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_url: impl Into<String>,
        shop_id: impl Into<String>,
        api_key: impl Into<String>,
        receipt: ReceiptSettings,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            shop_id: shop_id.into(),
            api_key: api_key.into(),
            receipt,
        })
    }

    fn body(&self, request: &CheckoutRequest) -> CreatePaymentBody {
        let amount = Amount {
            value: format!("{:.2}", request.amount),
            currency: request.currency.clone(),
        };
        CreatePaymentBody {
            amount: amount.clone(),
            confirmation: ConfirmationRequest {
                kind: "redirect",
                return_url: request.return_url.clone(),
            },
            capture: true,
            description: request.description.clone(),
            metadata: Metadata {
                payment_db_id: request.payment_id.get(),
                tariff: request.tariff.clone(),
            },
            receipt: Receipt {
                customer: Customer {
                    email: self.receipt.customer_email.clone(),
                },
                items: vec![ReceiptItem {
                    description: request.description.clone(),
                    quantity: "1.00".to_string(),
                    amount,
                    vat_code: self.receipt.vat_code,
                    payment_mode: "full_prepayment",
                    payment_subject: "service",
                }],
                tax_system_code: self.receipt.tax_system_code,
            },
        }
    }
}

fn into_provider_payment(body: PaymentBody) -> Result<ProviderPayment, PaymentError> {
    let status = body
        .status
        .parse::<PaymentStatus>()
        .map_err(PaymentError::Provider)?;
    Ok(ProviderPayment {
        id: body.id,
        status,
        confirmation_url: body.confirmation.and_then(|c| c.confirmation_url),
    })
}

async fn read_payment(response: Response, provider_id: &str) -> Result<ProviderPayment, PaymentError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(PaymentError::NotFound(provider_id.to_string()));
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.summary())
            .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
        warn!(status = status.as_u16(), reason = %reason, "payment provider error");
        return Err(PaymentError::Provider(reason));
    }
    let body: PaymentBody = response.json().await?;
    into_provider_payment(body)
}

#[async_trait]
impl PaymentProvider for YooKassaClient {
    async fn create_payment(
        &self,
        request: &CheckoutRequest,
    ) -> Result<ProviderPayment, PaymentError> {
        let response = self
            .client
            .post(format!("{}/payments", self.api_url))
            .basic_auth(&self.shop_id, Some(&self.api_key))
            .header("Idempotence-Key", &request.idempotency_key)
            .json(&self.body(request))
            .send()
            .await?;
        let payment = read_payment(response, "new").await?;
        debug!(
            payment_id = request.payment_id.get(),
            provider_id = %payment.id,
            status = %payment.status,
            "payment created"
        );
        Ok(payment)
    }

    async fn fetch_payment(&self, provider_id: &str) -> Result<ProviderPayment, PaymentError> {
        let response = self
            .client
            .get(format!("{}/payments/{provider_id}", self.api_url))
            .basic_auth(&self.shop_id, Some(&self.api_key))
            .send()
            .await?;
        read_payment(response, provider_id).await
    }
}
