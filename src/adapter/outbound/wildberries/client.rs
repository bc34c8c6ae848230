//! Statistics and supplies API client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::time::to_marketplace_local;
use crate::error::GatewayError;
use crate::port::outbound::gateway::{
    GatewayResult, RawCoefficient, RawIncome, RawOrder, RawReportLine, RawSale, RawStock,
    StatisticsGateway, REPORT_PAGE_LIMIT,
};

pub const DEFAULT_STATISTICS_URL: &str = "https://statistics-api.wildberries.ru";
pub const DEFAULT_SUPPLIES_URL: &str = "https://supplies-api.wildberries.ru";

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// HTTP client for the seller statistics API.
///
/// Every call carries the configured timeout. Failures come back as
/// [`GatewayError`]; nothing is swallowed here.
#[derive(Debug, Clone)]
pub struct WildberriesClient {
    client: Client,
    statistics_url: String,
    supplies_url: String,
    report_attempts: u32,
    report_backoff: Duration,
    report_page_limit: u32,
}

impl WildberriesClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        statistics_url: impl Into<String>,
        supplies_url: impl Into<String>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::from_reqwest("client", e))?;
        Ok(Self {
            client,
            statistics_url: statistics_url.into().trim_end_matches('/').to_string(),
            supplies_url: supplies_url.into().trim_end_matches('/').to_string(),
            report_attempts: 3,
            report_backoff: Duration::from_secs(60),
            report_page_limit: REPORT_PAGE_LIMIT,
        })
    }

    /// Retry policy for HTTP 429 on the realization report.
    #[must_use]
    pub fn with_report_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.report_attempts = attempts.max(1);
        self.report_backoff = backoff;
        self
    }

    /// Rows requested per realization report page.
    #[must_use]
    pub fn with_report_page_limit(mut self, limit: u32) -> Self {
        self.report_page_limit = limit.max(1);
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
        credential: &str,
        query: &[(&str, String)],
    ) -> GatewayResult<Vec<T>> {
        let response = self
            .client
            .get(url)
            .header("Authorization", credential)
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(endpoint, e))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited {
                endpoint,
                attempts: 1,
            });
        }
        if !status.is_success() {
            return Err(GatewayError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::from_reqwest(endpoint, e))?;
        decode(endpoint, &body)
    }

    fn statistics(&self, path: &str) -> String {
        format!("{}/api/{path}", self.statistics_url)
    }

    async fn delta<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        credential: &str,
        since: DateTime<Utc>,
        with_flag: bool,
    ) -> GatewayResult<Vec<T>> {
        let date_from = to_marketplace_local(since).format(DATE_TIME_FORMAT);
        let mut query = vec![("dateFrom", date_from.to_string())];
        if with_flag {
            query.push(("flag", "0".to_string()));
        }
        let url = self.statistics(&format!("v1/supplier/{endpoint}"));
        let rows: Vec<T> = self.get(endpoint, &url, credential, &query).await?;
        debug!(endpoint, rows = rows.len(), "statistics fetched");
        Ok(rows)
    }
}

/// Decode a JSON array. An empty body or `null` is an empty list.
fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> GatewayResult<Vec<T>> {
    let body = body.trim();
    if body.is_empty() || body == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|e| GatewayError::Decode {
        endpoint,
        reason: e.to_string(),
    })
}

#[async_trait]
impl StatisticsGateway for WildberriesClient {
    async fn orders(&self, credential: &str, since: DateTime<Utc>) -> GatewayResult<Vec<RawOrder>> {
        self.delta("orders", credential, since, true).await
    }

    async fn sales(&self, credential: &str, since: DateTime<Utc>) -> GatewayResult<Vec<RawSale>> {
        self.delta("sales", credential, since, true).await
    }

    async fn stocks(&self, credential: &str, since: DateTime<Utc>) -> GatewayResult<Vec<RawStock>> {
        self.delta("stocks", credential, since, false).await
    }

    async fn incomes(
        &self,
        credential: &str,
        since: DateTime<Utc>,
    ) -> GatewayResult<Vec<RawIncome>> {
        self.delta("incomes", credential, since, false).await
    }

    async fn acceptance_coefficients(
        &self,
        credential: &str,
    ) -> GatewayResult<Vec<RawCoefficient>> {
        let url = format!("{}/api/v1/acceptance/coefficients", self.supplies_url);
        self.get("coefficients", &url, credential, &[]).await
    }

    fn report_page_limit(&self) -> u32 {
        self.report_page_limit
    }

    async fn report_page(
        &self,
        credential: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        rrd_id: i64,
        limit: u32,
    ) -> GatewayResult<Vec<RawReportLine>> {
        let url = self.statistics("v5/supplier/reportDetailByPeriod");
        let query = [
            ("dateFrom", to_marketplace_local(from).format(DATE_FORMAT).to_string()),
            ("dateTo", to_marketplace_local(to).format(DATE_FORMAT).to_string()),
            ("rrdid", rrd_id.to_string()),
            ("limit", limit.to_string()),
        ];

        let mut attempt = 1;
        loop {
            match self.get("report", &url, credential, &query).await {
                Err(GatewayError::RateLimited { .. }) if attempt < self.report_attempts => {
                    warn!(attempt, backoff = ?self.report_backoff, "report rate limited, retrying");
                    tokio::time::sleep(self.report_backoff).await;
                    attempt += 1;
                }
                Err(GatewayError::RateLimited { endpoint, .. }) => {
                    return Err(GatewayError::RateLimited {
                        endpoint,
                        attempts: attempt,
                    });
                }
                other => return other,
            }
        }
    }
}
