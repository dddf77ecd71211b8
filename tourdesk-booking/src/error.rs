use tourdesk_core::{BookingStatus, StoreError};

/// Caller-facing failures of the booking operations.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Missing required fields: scheduleId, customerName, customerEmail, numGuests")]
    MissingFields,

    #[error("Invalid email format")]
    InvalidEmailFormat,

    #[error("numGuests must be a positive integer")]
    InvalidGuestCount,

    #[error("Schedule not found")]
    ScheduleNotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Only {remaining} spots available")]
    InsufficientCapacity { remaining: i32 },

    #[error("Booking could not be completed after {attempts} attempts, please retry")]
    TransactionConflict { attempts: u32 },

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Cannot change booking status from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    /// Details stay in the server log; the display text is what callers see.
    #[error("Failed to process booking")]
    Unexpected(String),
}

/// Failure of a single transactional attempt. Store errors are kept apart
/// so the retry loop can tell transient conflicts from business rejections.
#[derive(Debug)]
pub(crate) enum AttemptError {
    Rejected(BookingError),
    Store(StoreError),
}

impl From<BookingError> for AttemptError {
    fn from(err: BookingError) -> Self {
        AttemptError::Rejected(err)
    }
}

impl From<StoreError> for AttemptError {
    fn from(err: StoreError) -> Self {
        AttemptError::Store(err)
    }
}
