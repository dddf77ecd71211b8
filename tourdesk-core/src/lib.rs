pub mod booking;
pub mod repository;
pub mod notification;

pub use booking::{Booking, BookingDetails, BookingGuest, BookingStatus, OperatorContact, PaymentStatus, ScheduleContext};
pub use repository::{BookingFilter, BookingRepository, CatalogRepository, Page, PageRequest, ReservationStore, ReservationTx, TourFilter};
pub use notification::{LogDispatcher, NotificationDispatcher, NotificationError};

/// Persistence failures, classified so callers can decide whether a retry helps.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serialization failure, deadlock or lock/statement timeout. Retry the whole transaction.
    #[error("Transaction conflict: {0}")]
    Conflict(String),
    #[error("Booking reference already exists: {0}")]
    DuplicateReference(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_) | StoreError::DuplicateReference(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
