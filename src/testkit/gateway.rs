//! Scripted statistics gateway.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::GatewayError;
use crate::port::outbound::gateway::{
    GatewayResult, RawCoefficient, RawIncome, RawOrder, RawReportLine, RawSale, RawStock,
    StatisticsGateway, REPORT_PAGE_LIMIT,
};

#[derive(Default)]
struct Script {
    orders: HashMap<String, Vec<RawOrder>>,
    sales: HashMap<String, Vec<RawSale>>,
    stocks: HashMap<String, Vec<RawStock>>,
    incomes: HashMap<String, Vec<RawIncome>>,
    coefficients: HashMap<String, Vec<RawCoefficient>>,
    report: HashMap<String, Vec<RawReportLine>>,
    report_page_limit: Option<u32>,
    failing: HashSet<String>,
    calls: Vec<(&'static str, String)>,
}

/// Returns canned payloads per credential; failing credentials get
/// HTTP 500 on every endpoint.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_orders(&self, credential: &str, rows: Vec<RawOrder>) {
        self.script.lock().orders.insert(credential.to_string(), rows);
    }

    pub fn set_sales(&self, credential: &str, rows: Vec<RawSale>) {
        self.script.lock().sales.insert(credential.to_string(), rows);
    }

    pub fn set_stocks(&self, credential: &str, rows: Vec<RawStock>) {
        self.script.lock().stocks.insert(credential.to_string(), rows);
    }

    pub fn set_incomes(&self, credential: &str, rows: Vec<RawIncome>) {
        self.script.lock().incomes.insert(credential.to_string(), rows);
    }

    pub fn set_coefficients(&self, credential: &str, rows: Vec<RawCoefficient>) {
        self.script
            .lock()
            .coefficients
            .insert(credential.to_string(), rows);
    }

    pub fn set_report(&self, credential: &str, rows: Vec<RawReportLine>) {
        self.script.lock().report.insert(credential.to_string(), rows);
    }

    pub fn set_report_page_limit(&self, limit: u32) {
        self.script.lock().report_page_limit = Some(limit);
    }

    pub fn fail(&self, credential: &str) {
        self.script.lock().failing.insert(credential.to_string());
    }

    /// Endpoints called so far, with the credential used.
    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.script.lock().calls.clone()
    }

    fn answer<T: Clone>(
        &self,
        endpoint: &'static str,
        credential: &str,
        pick: impl FnOnce(&Script) -> Option<&Vec<T>>,
    ) -> GatewayResult<Vec<T>> {
        let mut script = self.script.lock();
        script.calls.push((endpoint, credential.to_string()));
        if script.failing.contains(credential) {
            return Err(GatewayError::Status {
                endpoint,
                status: 500,
            });
        }
        Ok(pick(&script).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl StatisticsGateway for ScriptedGateway {
    async fn orders(&self, credential: &str, _since: DateTime<Utc>) -> GatewayResult<Vec<RawOrder>> {
        self.answer("orders", credential, |s| s.orders.get(credential))
    }

    async fn sales(&self, credential: &str, _since: DateTime<Utc>) -> GatewayResult<Vec<RawSale>> {
        self.answer("sales", credential, |s| s.sales.get(credential))
    }

    async fn stocks(&self, credential: &str, _since: DateTime<Utc>) -> GatewayResult<Vec<RawStock>> {
        self.answer("stocks", credential, |s| s.stocks.get(credential))
    }

    async fn incomes(
        &self,
        credential: &str,
        _since: DateTime<Utc>,
    ) -> GatewayResult<Vec<RawIncome>> {
        self.answer("incomes", credential, |s| s.incomes.get(credential))
    }

    async fn acceptance_coefficients(
        &self,
        credential: &str,
    ) -> GatewayResult<Vec<RawCoefficient>> {
        self.answer("coefficients", credential, |s| s.coefficients.get(credential))
    }

    fn report_page_limit(&self) -> u32 {
        self.script
            .lock()
            .report_page_limit
            .unwrap_or(REPORT_PAGE_LIMIT)
    }

    async fn report_page(
        &self,
        credential: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
        rrd_id: i64,
        limit: u32,
    ) -> GatewayResult<Vec<RawReportLine>> {
        let rows = self.answer("report", credential, |s| s.report.get(credential))?;
        Ok(rows
            .into_iter()
            .filter(|row| row.rrd_id.unwrap_or(0) > rrd_id)
            .take(limit as usize)
            .collect())
    }
}
