use tourdesk_catalog::capacity;
use tourdesk_catalog::TourSchedule;
use tourdesk_core::{ReservationTx, StoreError};
use tracing::debug;

use crate::error::{AttemptError, BookingError};

/// Seats granted by a successful reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationOutcome {
    pub reserved_guests: i32,
    pub remaining_spots: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Schedule not found")]
    ScheduleNotFound,
    #[error("Insufficient capacity, {available} spots available")]
    InsufficientCapacity { available: i32 },
    #[error("Invalid seat quantity {0}")]
    InvalidQuantity(i32),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for AttemptError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ScheduleNotFound => BookingError::ScheduleNotFound.into(),
            LedgerError::InsufficientCapacity { available } => {
                BookingError::InsufficientCapacity { remaining: available }.into()
            }
            LedgerError::InvalidQuantity(_) => BookingError::InvalidGuestCount.into(),
            LedgerError::Store(e) => AttemptError::Store(e),
        }
    }
}

/// Sole writer of a schedule's `available_spots` counter.
///
/// Every call runs inside the caller's transaction. The decrement is a
/// conditional update, so two transactions can never both consume the last
/// seats even if the store only offers read-committed isolation.
#[derive(Debug, Default, Clone, Copy)]
pub struct CapacityLedger;

impl CapacityLedger {
    pub async fn try_reserve(
        &self,
        tx: &mut dyn ReservationTx,
        schedule: &TourSchedule,
        requested_guests: i32,
    ) -> Result<ReservationOutcome, LedgerError> {
        if requested_guests < 1 {
            return Err(LedgerError::InvalidQuantity(requested_guests));
        }

        let remaining = match tx.take_spots(schedule.id, requested_guests).await? {
            Some(remaining) => remaining,
            None => {
                let available = tx
                    .available_spots(schedule.id)
                    .await?
                    .ok_or(LedgerError::ScheduleNotFound)?;
                return Err(LedgerError::InsufficientCapacity { available });
            }
        };

        self.sync_status(tx, schedule, remaining).await?;
        debug!("Reserved {} spots on schedule {}, {} left", requested_guests, schedule.id, remaining);

        Ok(ReservationOutcome {
            reserved_guests: requested_guests,
            remaining_spots: remaining,
        })
    }

    /// Give back the full guest count of a cancelled booking.
    pub async fn release(
        &self,
        tx: &mut dyn ReservationTx,
        schedule: &TourSchedule,
        quantity: i32,
    ) -> Result<i32, LedgerError> {
        if quantity < 1 {
            return Err(LedgerError::InvalidQuantity(quantity));
        }

        let remaining = tx
            .release_spots(schedule.id, quantity)
            .await?
            .ok_or(LedgerError::ScheduleNotFound)?;

        self.sync_status(tx, schedule, remaining).await?;
        debug!("Released {} spots on schedule {}, {} available", quantity, schedule.id, remaining);
        Ok(remaining)
    }

    async fn sync_status(&self, tx: &mut dyn ReservationTx, schedule: &TourSchedule, remaining: i32) -> Result<(), LedgerError> {
        let next = capacity::status_for(schedule.status, remaining);
        if next != schedule.status {
            tx.set_schedule_status(schedule.id, next).await?;
        }
        Ok(())
    }
}
