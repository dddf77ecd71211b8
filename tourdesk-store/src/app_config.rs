use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub kafka: Option<KafkaConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 { 3 }
fn default_retry_backoff_ms() -> u64 { 25 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    /// Upper bound for any statement inside a reservation transaction.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_ms: u64,
}

fn default_max_connections() -> u32 { 10 }
fn default_acquire_timeout() -> u64 { 3 }
fn default_statement_timeout() -> u64 { 5000 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_booking_topic")]
    pub booking_topic: String,
}

fn default_booking_topic() -> String { "booking.created".to_string() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment specific overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `TOURDESK__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("TOURDESK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 9000

                [database]
                url = "postgres://localhost/tourdesk"

                [auth]
                jwt_secret = "secret"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.database.statement_timeout_ms, 5000);
        assert_eq!(cfg.booking.max_attempts, 3);
        assert!(cfg.redis.is_none());
        assert!(cfg.kafka.is_none());
    }
}
