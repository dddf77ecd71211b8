pub mod tour;
pub mod pricing;
pub mod capacity;

pub use tour::{CatalogError, NewSchedule, NewTour, ScheduleStatus, Tour, TourSchedule, TourUpdate, CURRENCY};
pub use pricing::{PriceQuote, PricingError};
pub use capacity::CapacityError;
