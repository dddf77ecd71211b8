use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tourdesk_core::StoreError;
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Classify a driver error. Serialization failures, deadlocks and lock or
/// statement timeouts are transient; a unique violation on the booking
/// reference means the generator collided.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("40001") | Some("40P01") | Some("55P03") | Some("57014") => {
                StoreError::Conflict(db.message().to_string())
            }
            Some("23505") if db.constraint() == Some("bookings_booking_reference_key") => {
                StoreError::DuplicateReference(db.message().to_string())
            }
            _ => StoreError::Database(err.to_string()),
        },
        sqlx::Error::PoolTimedOut => StoreError::Conflict("connection pool timed out".to_string()),
        sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
        _ => StoreError::Database(err.to_string()),
    }
}
