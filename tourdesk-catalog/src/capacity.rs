//! Seat counter arithmetic shared by every store implementation.
//!
//! Stores apply these rules inside their own transaction; nothing here reads
//! or writes persistent state.

use crate::tour::ScheduleStatus;

/// Remaining seats after taking `requested` from `available`.
pub fn reserve(available: i32, requested: i32) -> Result<i32, CapacityError> {
    if requested < 1 {
        return Err(CapacityError::InvalidQuantity(requested));
    }
    if available < requested {
        return Err(CapacityError::Insufficient { requested, available });
    }
    Ok(available - requested)
}

/// Seats after giving `released` back, never above the tour capacity.
pub fn release(available: i32, released: i32, max_capacity: i32) -> Result<i32, CapacityError> {
    if released < 1 {
        return Err(CapacityError::InvalidQuantity(released));
    }
    Ok(available.saturating_add(released).min(max_capacity))
}

/// Status a schedule should carry once its counter reads `remaining`.
/// Cancelled departures keep their status.
pub fn status_for(current: ScheduleStatus, remaining: i32) -> ScheduleStatus {
    match current {
        ScheduleStatus::Cancelled => ScheduleStatus::Cancelled,
        _ if remaining == 0 => ScheduleStatus::Full,
        _ => ScheduleStatus::Available,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapacityError {
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("Insufficient capacity: requested {requested}, available {available}")]
    Insufficient {
        requested: i32,
        available: i32,
    },
}
