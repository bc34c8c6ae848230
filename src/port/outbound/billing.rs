//! Payment provider port.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::payment::PaymentStatus;
use crate::domain::PaymentId;
use crate::error::PaymentError;

/// A redirect checkout to create at the provider.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Sent as the provider idempotency key.
    pub idempotency_key: String,
    pub payment_id: PaymentId,
    pub tariff: String,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub return_url: String,
}

/// The provider's view of a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPayment {
    pub id: String,
    pub status: PaymentStatus,
    pub confirmation_url: Option<String>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment(
        &self,
        request: &CheckoutRequest,
    ) -> Result<ProviderPayment, PaymentError>;

    async fn fetch_payment(&self, provider_id: &str) -> Result<ProviderPayment, PaymentError>;
}
