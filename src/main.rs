use softphone::application::{SoftphoneRepositories, SoftphoneService};
use softphone::config::Config;
use softphone::infrastructure::persistence::MemoryStorage;
use softphone::infrastructure::telephony::{CallClient, LoopbackVendor};
use softphone::interface::api::{build_router, init_metrics, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // RUST_LOG wins over the configured level
    let mut default_filter = config.logging.level.clone();
    if config.telephony.debug {
        default_filter.push_str(",softphone::infrastructure::telephony=debug");
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting softphone service");
    info!("Configuration loaded: {:?}", config);

    let storage = Arc::new(MemoryStorage::new());
    let repositories = SoftphoneRepositories {
        call_logs: storage.clone(),
        contacts: storage.clone(),
        settings: storage.clone(),
        conferences: storage.clone(),
    };

    let vendor = Arc::new(LoopbackVendor::new().auto_answer(config.telephony.auto_answer));
    let client = Arc::new(
        CallClient::new(vendor).with_connect_timeout(config.telephony.connect_timeout()),
    );
    let softphone = Arc::new(SoftphoneService::start(client, repositories.clone()).await);

    let prometheus_handle = init_metrics()?;
    let state = AppState {
        softphone: softphone.clone(),
        call_logs: repositories.call_logs,
        contacts: repositories.contacts,
        settings: repositories.settings,
        conferences: repositories.conferences,
    };
    let app = build_router(state, prometheus_handle);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("REST API listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down...");
            }
        })
        .await?;

    softphone.disconnect().await;
    info!("Softphone service stopped");
    Ok(())
}
