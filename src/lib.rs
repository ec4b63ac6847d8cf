pub mod config;
pub mod core;
pub mod log;
pub mod market;
pub mod notify;
pub mod store;
pub mod sync;

use anyhow::Result;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub skip_alerts: bool,
}

/// One reconciliation run, wired from the environment: the token-based
/// batched upstream when its refresh token is configured, the chart-style
/// upstream otherwise.
pub async fn run(options: RunOptions) -> Result<()> {
    info!("navsync starting...");

    // Config carries credentials; only presence flags are logged.
    let config = config::AppConfig::from_env();

    let store = store::notion::NotionStore::new(
        &config.notion_base_url,
        config.notion_api_key.clone(),
        config.notion_database_id.clone(),
    )?;
    let notifier = notify::webhook::WebhookNotifier::new(config.alert_webhook_url.clone())?;
    let reconcile_options = sync::ReconcileOptions {
        skip_alerts: options.skip_alerts,
        ..sync::ReconcileOptions::default()
    };

    let summary = if config.ifind_refresh_token.is_some() {
        let market = market::ifind::IfindProvider::new(
            &config.ifind_base_url,
            config.ifind_refresh_token.clone(),
        )?;
        sync::reconcile(&store, &market, &notifier, &reconcile_options).await?
    } else {
        let market = market::yahoo::YahooProvider::new(&config.yahoo_base_url)?;
        sync::reconcile(&store, &market, &notifier, &reconcile_options).await?
    };

    info!(
        "run complete: {}/{} records updated, {} alerts, {} failures",
        summary.updated, summary.total, summary.alerts_sent, summary.failures
    );
    Ok(())
}
