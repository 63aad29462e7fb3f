use std::sync::Arc;

use crate::{config::Config, events::EventBus, events::EventBusNotifier};
use pricewatch_core::{
    alerts::{AlertMonitor, AlertMonitorTrait, AlertService, AlertServiceTrait},
    notifications::{CompositeNotifier, LogNotifier, Notifier},
    quotes::{QuoteService, QuoteServiceTrait},
};
use pricewatch_market_data::{MarketDataClient, MarketDataConfig};
use pricewatch_storage_sqlite::{
    alerts::AlertRepository,
    db::{self, write_actor},
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub alert_service: Arc<dyn AlertServiceTrait>,
    pub alert_monitor: Arc<dyn AlertMonitorTrait>,
    pub quote_service: Arc<dyn QuoteServiceTrait>,
    pub market_data: Arc<MarketDataClient>,
    pub event_bus: EventBus,
    pub cron_secret: Option<String>,
}

pub fn init_tracing() {
    let log_format = std::env::var("PW_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&db::get_db_path(&config.db_path))?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    let market_data = Arc::new(MarketDataClient::from_api_key(
        config.finnhub_api_key.as_deref(),
        MarketDataConfig {
            quote_timeout: config.quote_timeout,
            ..MarketDataConfig::default()
        },
    )?);
    tracing::info!(
        "Market data provider: {} (demo: {})",
        market_data.provider_id(),
        market_data.is_demo()
    );

    let event_bus = EventBus::new(256);
    let notifier: Arc<dyn Notifier> = Arc::new(CompositeNotifier::new(vec![
        Arc::new(LogNotifier),
        Arc::new(EventBusNotifier::new(event_bus.clone())),
    ]));

    let alert_repository = Arc::new(AlertRepository::new(pool.clone(), writer));
    let alert_service = Arc::new(AlertService::new(alert_repository.clone()));
    let alert_monitor = Arc::new(AlertMonitor::new(
        alert_repository,
        market_data.clone(),
        notifier,
    ));
    let quote_service = Arc::new(QuoteService::new(market_data.clone()));

    Ok(Arc::new(AppState {
        alert_service,
        alert_monitor,
        quote_service,
        market_data,
        event_bus,
        cron_secret: config.cron_secret.clone(),
    }))
}
