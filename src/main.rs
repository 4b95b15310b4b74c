use std::sync::Arc;
use std::time::Duration;

use pnl_reporter::config::AppConfig;
use pnl_reporter::db::{self, PgPositionStore};
use pnl_reporter::pricing::{CoinGeckoClient, PriceLookup, TokenAliases};
use pnl_reporter::services;
use pnl_reporter::sheets::auth::ServiceAccountKey;
use pnl_reporter::sheets::{GoogleSheet, LogSink, ReportSink, ServiceAccount};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let config = AppConfig::from_env()?;
    let metrics_handle = pnl_reporter::metrics::init_metrics()?;

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!(table = %config.positions_table, "Database connected");
    let store = PgPositionStore::new(pool, config.positions_table.clone());

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let coingecko = CoinGeckoClient::new(
        http.clone(),
        config.coingecko_api_url.clone(),
        config.coingecko_api_key.clone(),
    );
    let prices = PriceLookup::new(
        Arc::new(coingecko),
        TokenAliases::with_overrides(&config.token_aliases),
    );

    let sink = build_sink(&config, http)?;

    let summary = services::run_once(
        &store,
        &prices,
        sink.as_ref(),
        config.price_lookup_concurrency,
    )
    .await;

    tracing::info!(
        rows = summary.refresh.rows,
        prices_updated = summary.refresh.updated,
        prices_skipped = summary.refresh.skipped,
        failed_writes = summary.refresh.failed_writes,
        results = summary.results,
        published = summary.published,
        "Run complete"
    );
    tracing::debug!(metrics = %metrics_handle.render(), "Run metrics");

    Ok(())
}

fn build_sink(config: &AppConfig, http: reqwest::Client) -> anyhow::Result<Box<dyn ReportSink>> {
    if config.dry_run {
        tracing::warn!("DRY_RUN=true: report will be logged, not written to Google Sheets");
        return Ok(Box::new(LogSink));
    }

    let (Some(sheet_id), Some(tab), Some(credentials)) = (
        config.google_sheet_id.clone(),
        config.google_sheet_name.clone(),
        config.google_credentials.as_deref(),
    ) else {
        anyhow::bail!("Google Sheets configuration is incomplete");
    };

    let key = ServiceAccountKey::from_file(credentials)?;
    let auth = ServiceAccount::new(http.clone(), key);
    tracing::info!(
        client_email = %auth.client_email(),
        tab = %tab,
        "Publishing to Google Sheets"
    );

    Ok(Box::new(GoogleSheet::new(http, Arc::new(auth), sheet_id, tab)))
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pnl_reporter=info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
