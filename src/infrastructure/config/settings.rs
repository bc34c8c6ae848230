//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; secrets (the bot token and the
//! payment shop credentials) come only from the environment.
//!
//! # Example
//!
//! ```no_run
//! use stockpulse::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::gateway::GatewayConfig;
use super::logging::LoggingConfig;
use super::payment::{PaymentConfig, ShopCredentials};
use super::products::ProductsConfig;
use super::retention::RetentionConfig;
use super::sync::SyncConfig;
use super::telegram::TelegramConfig;
use crate::error::{ConfigError, Result};

pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Statistics API and catalog endpoints.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Poll intervals and trailing windows.
    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub payment: PaymentConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub products: ProductsConfig,

    /// Path to SQLite database file.
    ///
    /// Defaults to "stockpulse.db" in the current directory.
    #[serde(default = "default_database_path")]
    pub database: String,
}

fn default_database_path() -> String {
    "stockpulse.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            telegram: TelegramConfig::default(),
            gateway: GatewayConfig::default(),
            sync: SyncConfig::default(),
            payment: PaymentConfig::default(),
            retention: RetentionConfig::default(),
            products: ProductsConfig::default(),
            database: default_database_path(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive(field: &'static str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than 0".to_string(),
        }
        .into());
    }
    Ok(())
}

fn url(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField { field }.into());
    }
    url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        field,
        reason: e.to_string(),
    })?;
    Ok(())
}

impl Config {
    /// Parse configuration from TOML content, reading secrets from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        Self::parse_toml_with(content, |key| std::env::var(key).ok())
    }

    /// Parse configuration, resolving secrets through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml_with<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        config.telegram.bot_token = non_empty(lookup(BOT_TOKEN_ENV));

        let (shop_key, api_key) = config.payment.mode.env_keys();
        config.payment.credentials = match (non_empty(lookup(shop_key)), non_empty(lookup(api_key)))
        {
            (Some(shop_id), Some(api_key)) => Some(ShopCredentials { shop_id, api_key }),
            _ => None,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }

        url("gateway.statistics_url", &self.gateway.statistics_url)?;
        url("gateway.supplies_url", &self.gateway.supplies_url)?;
        url("gateway.card_url", &self.gateway.card_url)?;
        positive("gateway.timeout_secs", self.gateway.timeout_secs)?;
        positive(
            "gateway.report_attempts",
            u64::from(self.gateway.report_attempts),
        )?;
        positive(
            "gateway.report_page_limit",
            u64::from(self.gateway.report_page_limit),
        )?;

        positive("sync.records_interval_secs", self.sync.records_interval_secs)?;
        positive(
            "sync.coefficients_interval_secs",
            self.sync.coefficients_interval_secs,
        )?;
        positive("sync.report_interval_secs", self.sync.report_interval_secs)?;
        for (field, days) in [
            ("sync.orders_lookback_days", self.sync.orders_lookback_days),
            ("sync.sales_lookback_days", self.sync.sales_lookback_days),
            ("sync.stocks_lookback_days", self.sync.stocks_lookback_days),
            ("sync.incomes_lookback_days", self.sync.incomes_lookback_days),
            ("sync.report_period_days", self.sync.report_period_days),
        ] {
            if days <= 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be at least 1 day".to_string(),
                }
                .into());
            }
        }
        if self.sync.initial_lag_minutes < 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.initial_lag_minutes",
                reason: "must be 0 or greater".to_string(),
            }
            .into());
        }

        url("payment.api_url", &self.payment.api_url)?;
        if let Some(return_url) = &self.payment.return_url {
            url("payment.return_url", return_url)?;
        }
        if !(1..=6).contains(&self.payment.vat_code) {
            return Err(ConfigError::InvalidValue {
                field: "payment.vat_code",
                reason: "must be between 1 and 6".to_string(),
            }
            .into());
        }
        if !self.payment.customer_email.contains('@') {
            return Err(ConfigError::InvalidValue {
                field: "payment.customer_email",
                reason: "must be an email address".to_string(),
            }
            .into());
        }
        positive("payment.timeout_secs", self.payment.timeout_secs)?;

        positive("retention.keep_months", u64::from(self.retention.keep_months))?;
        positive("retention.batch_size", self.retention.batch_size as u64)?;
        positive("retention.time_limit_secs", self.retention.time_limit_secs)?;

        if self.products.stale_days <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "products.stale_days",
                reason: "must be at least 1 day".to_string(),
            }
            .into());
        }
        positive(
            "products.refresh_concurrency",
            self.products.refresh_concurrency as u64,
        )?;
        positive("telegram.session_timeout_secs", self.telegram.session_timeout_secs)?;

        Ok(())
    }

    /// The bot token, required to run the bot.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` when `TELEGRAM_BOT_TOKEN` is unset.
    pub fn bot_token(&self) -> Result<&str> {
        self.telegram
            .bot_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField { field: BOT_TOKEN_ENV }.into())
    }

    /// Shop credentials for the configured payment mode.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` naming the first unset variable.
    pub fn shop_credentials(&self) -> Result<&ShopCredentials> {
        self.payment.credentials.as_ref().ok_or_else(|| {
            let (shop_key, _) = self.payment.mode.env_keys();
            ConfigError::MissingField { field: shop_key }.into()
        })
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::error::Error;
    use crate::infrastructure::config::payment::PaymentMode;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml_with("", env(&[])).unwrap();
        assert_eq!(config.database, "stockpulse.db");
        assert_eq!(config.sync.records_interval_secs, 60);
        assert_eq!(config.sync.windows().orders, chrono::Duration::days(7));
        assert_eq!(config.retention.policy().batch_size, 5_000);
        assert_eq!(config.products.catalog().refresh_concurrency, 3);
        assert!(config.bot_token().is_err());
        assert!(config.shop_credentials().is_err());
    }

    #[test]
    fn secrets_follow_payment_mode() {
        let toml = r#"
            [payment]
            mode = "test"
            return_url = "https://t.me/stockpulse_bot?start=paid"
        "#;
        let config = Config::parse_toml_with(
            toml,
            env(&[
                ("TELEGRAM_BOT_TOKEN", "123:abc"),
                ("YOOKASSA_SHOP_ID", "live-shop"),
                ("YOOKASSA_API_KEY", "live-key"),
                ("YOOKASSA_TEST_SHOP_ID", "test-shop"),
                ("YOOKASSA_TEST_API_KEY", "test-key"),
            ]),
        )
        .unwrap();

        assert_eq!(config.payment.mode, PaymentMode::Test);
        assert_eq!(config.bot_token().unwrap(), "123:abc");
        assert_eq!(config.shop_credentials().unwrap().shop_id, "test-shop");
        assert!(!format!("{:?}", config.payment).contains("test-key"));
    }

    #[test]
    fn missing_shop_credentials_name_the_variable() {
        let config =
            Config::parse_toml_with("", env(&[("YOOKASSA_SHOP_ID", "shop")])).unwrap();
        let err = config.shop_credentials().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField {
                field: "YOOKASSA_SHOP_ID"
            })
        ));
    }

    #[test]
    fn sections_override_defaults() {
        let toml = r#"
            database = "/var/lib/stockpulse/data.db"

            [logging]
            level = "debug"
            format = "json"

            [sync]
            records_interval_secs = 120
            orders_lookback_days = 3

            [retention]
            keep_months = 12
        "#;
        let config = Config::parse_toml_with(toml, env(&[])).unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.sync.schedule().records.as_secs(), 120);
        assert_eq!(config.sync.windows().orders, chrono::Duration::days(3));
        assert_eq!(config.sync.windows().sales, chrono::Duration::days(90));
        assert_eq!(config.retention.policy().keep_months, 12);
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            ("[sync]\nrecords_interval_secs = 0", "sync.records_interval_secs"),
            ("[sync]\norders_lookback_days = 0", "sync.orders_lookback_days"),
            ("[payment]\nvat_code = 9", "payment.vat_code"),
            ("[payment]\nreturn_url = \"not a url\"", "payment.return_url"),
            ("[retention]\nbatch_size = 0", "retention.batch_size"),
            ("[products]\nrefresh_concurrency = 0", "products.refresh_concurrency"),
            ("[gateway]\nstatistics_url = \"\"", "gateway.statistics_url"),
            ("[gateway]\nreport_page_limit = 0", "gateway.report_page_limit"),
        ];
        for (toml, expected) in cases {
            let err = Config::parse_toml_with(toml, env(&[])).unwrap_err();
            let field = match err {
                Error::Config(
                    ConfigError::InvalidValue { field, .. } | ConfigError::MissingField { field },
                ) => field,
                other => panic!("unexpected error for {expected}: {other}"),
            };
            assert_eq!(field, expected);
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::parse_toml_with("[sync\n", env(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
