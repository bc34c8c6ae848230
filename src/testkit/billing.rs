//! Fake payment provider and catalog enricher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::payment::PaymentStatus;
use crate::domain::{NmId, ProductDetails};
use crate::error::{Error, PaymentError, Result};
use crate::port::outbound::billing::{CheckoutRequest, PaymentProvider, ProviderPayment};
use crate::port::outbound::enrichment::ProductEnricher;

/// Creates `pending` payments and reports whatever status a test sets.
#[derive(Default)]
pub struct FakePaymentProvider {
    statuses: Mutex<HashMap<String, PaymentStatus>>,
    requests: Mutex<Vec<CheckoutRequest>>,
    counter: AtomicUsize,
}

impl FakePaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, provider_id: &str, status: PaymentStatus) {
        self.statuses.lock().insert(provider_id.to_string(), status);
    }

    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PaymentProvider for FakePaymentProvider {
    async fn create_payment(
        &self,
        request: &CheckoutRequest,
    ) -> std::result::Result<ProviderPayment, PaymentError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("yk-{n}");
        self.requests.lock().push(request.clone());
        self.statuses
            .lock()
            .insert(id.clone(), PaymentStatus::Pending);
        Ok(ProviderPayment {
            confirmation_url: Some(format!("https://pay.test/confirm/{id}")),
            id,
            status: PaymentStatus::Pending,
        })
    }

    async fn fetch_payment(
        &self,
        provider_id: &str,
    ) -> std::result::Result<ProviderPayment, PaymentError> {
        let status = self
            .statuses
            .lock()
            .get(provider_id)
            .copied()
            .ok_or_else(|| PaymentError::NotFound(provider_id.to_string()))?;
        Ok(ProviderPayment {
            id: provider_id.to_string(),
            status,
            confirmation_url: None,
        })
    }
}

/// Serves canned catalog details; unknown articles fail.
#[derive(Default)]
pub struct FakeEnricher {
    details: Mutex<HashMap<NmId, ProductDetails>>,
    lookups: AtomicUsize,
}

impl FakeEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, nm_id: NmId, details: ProductDetails) {
        self.details.lock().insert(nm_id, details);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductEnricher for FakeEnricher {
    async fn details(&self, nm_id: NmId) -> Result<ProductDetails> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.details
            .lock()
            .get(&nm_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("card {nm_id}")))
    }
}
