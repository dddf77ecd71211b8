use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tourdesk_api::{app, AppState, AuthConfig};
use tourdesk_booking::RetryPolicy;
use tourdesk_core::{LogDispatcher, NotificationDispatcher};
use tourdesk_store::{
    Config, DbClient, EventProducer, KafkaDispatcher, PgBookingRepository, PgCatalogRepository, PgReservationStore,
    RedisClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tourdesk_api=debug,tourdesk_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Tourdesk API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.migrate().await.context("Failed to run migrations")?;

    let dispatcher: Arc<dyn NotificationDispatcher> = match &config.kafka {
        Some(kafka) => {
            let producer = EventProducer::new(&kafka.brokers).context("Failed to create Kafka producer")?;
            tracing::info!("Booking notifications go to Kafka topic {}", kafka.booking_topic);
            Arc::new(KafkaDispatcher::new(producer, kafka.booking_topic.clone()))
        }
        None => {
            tracing::info!("No Kafka brokers configured, booking notifications are logged only");
            Arc::new(LogDispatcher)
        }
    };

    let retry = RetryPolicy::new(
        config.booking.max_attempts,
        Duration::from_millis(config.booking.retry_backoff_ms),
    );

    let mut state = AppState::new(
        Arc::new(PgReservationStore::new(db.pool.clone(), config.database.statement_timeout_ms)),
        Arc::new(PgCatalogRepository::new(db.pool.clone())),
        Arc::new(PgBookingRepository::new(db.pool.clone())),
        dispatcher,
        retry,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    );

    if let Some(redis) = &config.redis {
        let client = RedisClient::new(&redis.url).context("Invalid Redis URL")?;
        state = state.with_rate_limiter(client);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
