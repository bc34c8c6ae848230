use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures talking to the marketplace statistics API.
///
/// Pollers treat every variant as "no data for this credential this cycle".
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: &'static str },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("{endpoint} rate limited after {attempts} attempts")]
    RateLimited { endpoint: &'static str, attempts: u32 },

    #[error("transport error on {endpoint}: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {endpoint}: {reason}")]
    Decode { endpoint: &'static str, reason: String },
}

impl GatewayError {
    /// Classify a reqwest failure for the given endpoint.
    #[must_use]
    pub fn from_reqwest(endpoint: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { endpoint }
        } else if let Some(status) = err.status() {
            Self::Status {
                endpoint,
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::Decode {
                endpoint,
                reason: err.to_string(),
            }
        } else {
            Self::Transport {
                endpoint,
                source: err,
            }
        }
    }
}

/// Payment provider failures.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("unknown tariff: {0}")]
    UnknownTariff(String),

    #[error("payment not found: {0}")]
    NotFound(String),

    #[error("payment provider rejected request: {0}")]
    Provider(String),

    #[error("payment provider unreachable: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("delivery error: {0}")]
    Delivery(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// Lets store code use `?` inside Diesel transaction closures.
impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(err.to_string())
    }
}
