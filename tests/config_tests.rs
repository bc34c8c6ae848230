use std::fs;
use std::path::{Path, PathBuf};

use stockpulse::error::{ConfigError, Error};
use stockpulse::infrastructure::config::settings::Config;
use tokio_test::{assert_err, assert_ok};

fn write_temp_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn shipped_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.toml");
    let config = assert_ok!(Config::load(&path));

    assert_eq!(config.database, "stockpulse.db");
    assert_eq!(config.sync.records_interval_secs, 60);
    assert_eq!(config.sync.coefficients_interval_secs, 300);
    assert_eq!(config.retention.keep_months, 6);
    assert_eq!(config.telegram.session_timeout_secs, 600);
    assert_eq!(config.gateway.report_page_limit, 100_000);
}

#[test]
fn report_page_limit_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp_config(dir.path(), "[gateway]\nreport_page_limit = 500\n");
    let config = assert_ok!(Config::load(&path));
    assert_eq!(config.gateway.report_page_limit, 500);

    let path = write_temp_config(dir.path(), "[gateway]\nreport_page_limit = 0\n");
    let err = assert_err!(Config::load(&path));
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue {
            field: "gateway.report_page_limit",
            ..
        })
    ));
}

#[test]
fn config_rejects_zero_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp_config(
        dir.path(),
        "[sync]\nrecords_interval_secs = 0\n",
    );

    let err = assert_err!(Config::load(&path));
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue {
            field: "sync.records_interval_secs",
            ..
        })
    ));
}

#[test]
fn config_rejects_bad_gateway_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp_config(
        dir.path(),
        "[gateway]\nstatistics_url = \"not a url\"\n",
    );

    let err = assert_err!(Config::load(&path));
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue {
            field: "gateway.statistics_url",
            ..
        })
    ));
}

#[test]
fn config_reports_unreadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = assert_err!(Config::load(dir.path().join("missing.toml")));
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn config_reports_malformed_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp_config(dir.path(), "[sync\nrecords_interval_secs = 1");
    let err = assert_err!(Config::load(&path));
    assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
}

#[test]
fn secrets_resolve_from_lookup_per_payment_mode() {
    let toml = "[payment]\nmode = \"live\"\n";
    let config = Config::parse_toml_with(toml, |key| match key {
        "TELEGRAM_BOT_TOKEN" => Some("123:abc".to_string()),
        "YOOKASSA_SHOP_ID" => Some("shop".to_string()),
        "YOOKASSA_API_KEY" => Some("live_key".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.bot_token().unwrap(), "123:abc");
    assert_eq!(config.shop_credentials().unwrap().shop_id, "shop");

    let test_mode = Config::parse_toml_with("[payment]\nmode = \"test\"\n", |key| match key {
        "YOOKASSA_SHOP_ID" => Some("shop".to_string()),
        "YOOKASSA_API_KEY" => Some("live_key".to_string()),
        _ => None,
    })
    .unwrap();
    assert!(matches!(
        test_mode.shop_credentials().unwrap_err(),
        Error::Config(ConfigError::MissingField {
            field: "YOOKASSA_TEST_SHOP_ID"
        })
    ));
}
