use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use triplog::config::AppConfig;
use triplog::error::AppError;
use triplog::routes::create_router;
use triplog::services::distance::{DistanceLookup, OrsDistanceClient};
use triplog::services::rates::RateService;
use triplog::services::store::TripStore;
use triplog::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;

    let store = TripStore::new(config.data_dir.clone());
    store.ensure_structure().await?;
    let trips = store.load().await?;
    info!(
        "loaded {} trips from {}",
        trips.len(),
        store.trips_path().display()
    );

    let http = reqwest::Client::new();

    let rates = RateService::new(http.clone(), config.mileage_rate, config.rates_url.clone());
    let rate_per_mile = rates.resolve().await;
    info!(rate_per_mile, "mileage rate resolved");

    let distance: Option<Arc<dyn DistanceLookup>> = match &config.ors_api_key {
        Some(key) => Some(Arc::new(OrsDistanceClient::new(
            http.clone(),
            &config.ors_base_url,
            key.clone(),
        ))),
        None => {
            warn!("ORS_API_KEY not set, distance lookup disabled; trips need manual miles");
            None
        }
    };

    let state = AppState::new(config.clone(), store, distance, rate_per_mile);

    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,triplog=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
