pub mod error;
pub mod request;
pub mod reference;
pub mod retry;
pub mod ledger;
pub mod engine;
pub mod manager;

pub use error::BookingError;
pub use request::{CreateBookingRequest, GuestInput, ValidatedBooking};
pub use retry::RetryPolicy;
pub use ledger::{CapacityLedger, LedgerError, ReservationOutcome};
pub use engine::ReservationEngine;
pub use manager::BookingManager;
