use std::sync::Arc;
use tourdesk_booking::{BookingManager, ReservationEngine, RetryPolicy};
use tourdesk_core::{BookingRepository, CatalogRepository, NotificationDispatcher, ReservationStore};
use tourdesk_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReservationEngine>,
    pub manager: Arc<BookingManager>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub auth: AuthConfig,
    /// Per-IP limiter, only present when Redis is configured.
    pub rate_limiter: Option<Arc<RedisClient>>,
}

impl AppState {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        catalog: Arc<dyn CatalogRepository>,
        bookings: Arc<dyn BookingRepository>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        retry: RetryPolicy,
        auth: AuthConfig,
    ) -> Self {
        Self {
            engine: Arc::new(ReservationEngine::new(Arc::clone(&reservations), dispatcher, retry)),
            manager: Arc::new(BookingManager::new(reservations, retry)),
            catalog,
            bookings,
            auth,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: RedisClient) -> Self {
        self.rate_limiter = Some(Arc::new(limiter));
        self
    }
}
