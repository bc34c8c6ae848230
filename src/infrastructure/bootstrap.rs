//! Composition root: builds adapters from configuration and wires them into
//! the application services.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::report::CsvReportRenderer;
use crate::adapter::outbound::sqlite::database::connection::{
    create_pool, enable_wal, run_migrations,
};
use crate::adapter::outbound::sqlite::SqliteStore;
use crate::adapter::outbound::wildberries::{CardEnricher, WildberriesClient};
use crate::application::products::ProductCatalog;
use crate::application::retention::RetentionService;
use crate::application::scheduler::{Scheduler, SchedulerSettings};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::gateway::StatisticsGateway;
use crate::port::outbound::report::ReportRenderer;
use crate::port::outbound::store::RetentionReport;
use crate::port::outbound::transport::ChatTransport;

/// Open the database and apply pending migrations.
///
/// # Errors
/// Returns an error if the pool cannot be built or a migration fails.
pub fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let pool = create_pool(&config.database)?;
    if config.database != ":memory:" {
        enable_wal(&pool)?;
    }
    run_migrations(&pool)?;
    info!(database = %config.database, "database ready");
    Ok(Arc::new(SqliteStore::new(pool)))
}

pub(crate) fn build_gateway(config: &Config) -> Result<Arc<dyn StatisticsGateway>> {
    let gateway = &config.gateway;
    let client = WildberriesClient::new(
        &gateway.statistics_url,
        &gateway.supplies_url,
        gateway.timeout(),
    )?
    .with_report_retry(gateway.report_attempts, gateway.report_backoff())
    .with_report_page_limit(gateway.report_page_limit);
    Ok(Arc::new(client))
}

pub(crate) fn build_catalog(
    config: &Config,
    store: &Arc<SqliteStore>,
) -> Result<Arc<ProductCatalog<SqliteStore>>> {
    let enricher = CardEnricher::new(&config.gateway.card_url, config.gateway.timeout())?;
    Ok(Arc::new(ProductCatalog::new(
        Arc::clone(store),
        Arc::new(enricher),
        config.products.catalog(),
    )))
}

#[must_use]
pub fn scheduler_settings(config: &Config) -> SchedulerSettings {
    SchedulerSettings {
        schedule: config.sync.schedule(),
        windows: config.sync.windows(),
        retention: config.retention.policy(),
        report_period: config.sync.report_period(),
    }
}

/// Build the scheduler around an already opened store.
///
/// # Errors
/// Returns an error if an HTTP client cannot be built.
pub fn build_scheduler(
    config: &Config,
    store: &Arc<SqliteStore>,
    transport: Arc<dyn ChatTransport>,
) -> Result<Scheduler<SqliteStore>> {
    let renderer: Arc<dyn ReportRenderer> = Arc::new(CsvReportRenderer::new());
    Ok(Scheduler::new(
        Arc::clone(store),
        build_gateway(config)?,
        transport,
        renderer,
        build_catalog(config, store)?,
        scheduler_settings(config),
    ))
}

/// One retention sweep with the configured policy.
///
/// # Errors
/// Returns an error if the database cannot be opened or the sweep fails.
pub async fn cleanup(config: &Config) -> Result<RetentionReport> {
    let store = open_store(config)?;
    let report = RetentionService::new(store, config.retention.policy())
        .run()
        .await?;
    info!(
        orders = report.orders_deleted,
        sales = report.sales_deleted,
        report_lines = report.report_lines_deleted,
        timed_out = report.timed_out,
        "retention sweep finished"
    );
    Ok(report)
}

#[cfg(feature = "telegram")]
pub use self::telegram::{run, sync_once};

#[cfg(feature = "telegram")]
mod telegram {
    use std::sync::Arc;

    use teloxide::Bot;
    use tokio::sync::watch;
    use tracing::{error, info};

    use super::{build_scheduler, open_store};
    use crate::adapter::inbound::telegram::bot::run_bot;
    use crate::adapter::inbound::telegram::handler::{BotContext, BotSettings};
    use crate::adapter::outbound::report::CsvReportRenderer;
    use crate::adapter::outbound::telegram::TelegramTransport;
    use crate::adapter::outbound::yookassa::YooKassaClient;
    use crate::application::notify::DispatchReport;
    use crate::application::sync::SyncDomain;
    use crate::error::Result;
    use crate::infrastructure::config::settings::Config;

    /// Run the bot and the scheduler until Ctrl-C.
    ///
    /// # Errors
    /// Fails fast when the bot token or the payment shop credentials are
    /// missing, or the database cannot be opened.
    pub async fn run(config: Config) -> Result<()> {
        let token = config.bot_token()?;
        let shop = config.shop_credentials()?;

        let store = open_store(&config)?;
        let bot = Bot::new(token);
        let transport = Arc::new(TelegramTransport::new(bot.clone()));
        let provider = YooKassaClient::new(
            &config.payment.api_url,
            &shop.shop_id,
            &shop.api_key,
            config.payment.receipt(),
            config.payment.timeout(),
        )?;

        let scheduler = build_scheduler(&config, &store, transport.clone())?;
        let ctx = Arc::new(BotContext::new(
            Arc::clone(&store),
            transport,
            Arc::new(CsvReportRenderer::new()),
            Arc::new(provider),
            BotSettings {
                session_timeout: config.telegram.session_timeout(),
                return_url: config.payment.return_url.clone(),
            },
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler_task = {
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };
        let bot_task = tokio::spawn(run_bot(bot, ctx, shutdown_rx));

        info!(mode = ?config.payment.mode, "stockpulse running");
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
        // Receivers may already be gone if a task ended early.
        let _ = shutdown_tx.send(true);

        for (name, task) in [("scheduler", scheduler_task), ("bot", bot_task)] {
            if let Err(e) = task.await {
                error!(task = name, error = %e, "task ended abnormally");
            }
        }
        Ok(())
    }

    /// One poll and dispatch cycle for a single domain.
    ///
    /// # Errors
    /// Returns an error if the bot token is missing, the database cannot be
    /// opened or the poll fails.
    pub async fn sync_once(config: &Config, domain: SyncDomain) -> Result<DispatchReport> {
        let token = config.bot_token()?;
        let store = open_store(config)?;
        let transport = Arc::new(TelegramTransport::from_token(token));
        let scheduler = build_scheduler(config, &store, transport)?;
        let report = scheduler.sync_domain(domain).await?;
        info!(
            domain = %domain,
            delivered = report.delivered,
            failed = report.failed,
            "sync finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::outbound::store::UserStore;

    #[tokio::test]
    async fn open_store_migrates_a_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database: dir.path().join("test.db").display().to_string(),
            ..Config::default()
        };

        let store = open_store(&config).unwrap();
        let user = store
            .ensure_user(crate::domain::TelegramId::new(7))
            .await
            .unwrap();
        assert_eq!(user.telegram_id.get(), 7);

        // A second open sees the same schema and data.
        let again = open_store(&config).unwrap();
        assert!(again
            .user_by_telegram(crate::domain::TelegramId::new(7))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn cleanup_runs_on_an_empty_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database: dir.path().join("cleanup.db").display().to_string(),
            ..Config::default()
        };
        let report = cleanup(&config).await.unwrap();
        assert_eq!(report.total(), 0);
        assert!(!report.timed_out);
    }

    #[test]
    fn scheduler_settings_follow_config() {
        let mut config = Config::default();
        config.sync.coefficients_interval_secs = 900;
        config.retention.keep_months = 3;
        let settings = scheduler_settings(&config);
        assert_eq!(settings.schedule.coefficients.as_secs(), 900);
        assert_eq!(settings.retention.keep_months, 3);
    }
}
