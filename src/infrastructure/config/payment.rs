//! Payment provider configuration.
//!
//! Shop credentials never live in the config file: they come from
//! `YOOKASSA_SHOP_ID`/`YOOKASSA_API_KEY`, or the `YOOKASSA_TEST_*` pair
//! when `mode = "test"`.

use std::time::Duration;

use serde::Deserialize;

use crate::adapter::outbound::yookassa::{ReceiptSettings, DEFAULT_API_URL};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[default]
    Live,
    Test,
}

impl PaymentMode {
    /// Environment variable names for the shop id and API key.
    #[must_use]
    pub const fn env_keys(self) -> (&'static str, &'static str) {
        match self {
            Self::Live => ("YOOKASSA_SHOP_ID", "YOOKASSA_API_KEY"),
            Self::Test => ("YOOKASSA_TEST_SHOP_ID", "YOOKASSA_TEST_API_KEY"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ShopCredentials {
    pub shop_id: String,
    pub api_key: String,
}

impl std::fmt::Debug for ShopCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopCredentials")
            .field("shop_id", &self.shop_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// `[payment]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub mode: PaymentMode,
    pub api_url: String,
    /// Where checkout returns the buyer, usually `https://t.me/<bot>?start=paid`.
    pub return_url: Option<String>,
    pub customer_email: String,
    pub vat_code: u8,
    pub tax_system_code: Option<u8>,
    pub timeout_secs: u64,

    #[serde(skip)]
    pub credentials: Option<ShopCredentials>,
}

impl PaymentConfig {
    #[must_use]
    pub fn receipt(&self) -> ReceiptSettings {
        ReceiptSettings {
            customer_email: self.customer_email.clone(),
            vat_code: self.vat_code,
            tax_system_code: self.tax_system_code,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        let receipt = ReceiptSettings::default();
        Self {
            mode: PaymentMode::default(),
            api_url: DEFAULT_API_URL.to_string(),
            return_url: None,
            customer_email: receipt.customer_email,
            vat_code: receipt.vat_code,
            tax_system_code: receipt.tax_system_code,
            timeout_secs: 30,
            credentials: None,
        }
    }
}
