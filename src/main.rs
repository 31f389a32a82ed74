use std::sync::Arc;
use std::time::Duration;

use insider_sentinel::api::router::create_router;
use insider_sentinel::cache;
use insider_sentinel::config::{AgeLookupMode, AppConfig};
use insider_sentinel::db::{self, PgAlertStore};
use insider_sentinel::hub::BroadcastHub;
use insider_sentinel::ingestion::{IngestionTask, Pipeline};
use insider_sentinel::intelligence::{AgeResolver, FirstSeenLookup, SimulatedLookup};
use insider_sentinel::polymarket::DataClient;
use insider_sentinel::AppState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // Both tokio-tungstenite and reqwest pull in rustls; pin one provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = insider_sentinel::metrics::init_metrics();

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    // --- Enrichment: cache + slow lookup ---
    let age_cache = cache::connect_cache(config.redis_url.as_deref()).await;
    tracing::info!(backend = age_cache.backend_type(), "Enrichment cache ready");

    let lookup: Arc<dyn FirstSeenLookup> = match config.age_lookup {
        AgeLookupMode::Simulated => Arc::new(SimulatedLookup::default()),
        AgeLookupMode::DataApi => {
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?;
            Arc::new(DataClient::with_base_url(http, config.data_api_url.clone()))
        }
    };
    tracing::info!(mode = ?config.age_lookup, "Wallet age lookup configured");

    // --- Pipeline: normalize → classify → persist → broadcast ---
    let store = Arc::new(PgAlertStore::new(pool));
    let hub = BroadcastHub::new();
    let pipeline = Arc::new(Pipeline::new(
        config.risk_thresholds(),
        AgeResolver::new(Some(age_cache), lookup),
        store.clone(),
        Arc::new(hub.clone()),
    ));

    let thresholds = pipeline.thresholds();
    tracing::info!(
        noise_floor_usd = %thresholds.min_notable_usd,
        suspicious_usd = %thresholds.suspicious_usd,
        new_account_hours = thresholds.new_account_hours,
        mock = config.use_mock_data,
        "Starting ingestion"
    );
    let ingestion = IngestionTask::spawn(config.ingestion_mode(), pipeline);

    // --- Downstream: dashboard WS + history API ---
    let state = AppState {
        store,
        hub,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    ingestion.shutdown(SHUTDOWN_GRACE).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();
}
