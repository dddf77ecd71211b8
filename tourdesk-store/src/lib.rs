pub mod app_config;
pub mod database;
pub mod events;
pub mod memory;
pub mod redis_repo;
mod rows;

pub mod booking_repo;
pub mod catalog_repo;
pub mod reservation_repo;

pub use app_config::Config;
pub use booking_repo::PgBookingRepository;
pub use catalog_repo::PgCatalogRepository;
pub use database::DbClient;
pub use events::{EventProducer, KafkaDispatcher};
pub use memory::InMemoryStore;
pub use redis_repo::RedisClient;
pub use reservation_repo::PgReservationStore;
