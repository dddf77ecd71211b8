use chrono::Utc;
use std::sync::Arc;
use tourdesk_core::{Booking, BookingStatus, ReservationStore};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AttemptError, BookingError};
use crate::ledger::CapacityLedger;
use crate::retry::{self, RetryPolicy};

/// Status transitions after creation.
///
/// Cancellation is the symmetric path to a reservation: it restores the
/// booking's full guest count to the schedule in the same transaction that
/// marks the booking cancelled.
pub struct BookingManager {
    store: Arc<dyn ReservationStore>,
    ledger: CapacityLedger,
    retry: RetryPolicy,
}

impl BookingManager {
    pub fn new(store: Arc<dyn ReservationStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            ledger: CapacityLedger,
            retry,
        }
    }

    /// Transition: pending → confirmed
    pub async fn confirm_booking(&self, operator_id: Uuid, booking_id: Uuid) -> Result<Booking, BookingError> {
        let (booking, changed) = retry::run(&self.retry, "confirm_booking", || {
            self.attempt_transition(operator_id, booking_id, BookingStatus::Confirmed)
        })
        .await?;

        if changed {
            info!("Booking {} confirmed", booking.booking_reference);
        }
        Ok(booking)
    }

    /// Transition: pending | confirmed → cancelled, releasing the seats.
    /// Cancelling twice is a no-op.
    pub async fn cancel_booking(&self, operator_id: Uuid, booking_id: Uuid) -> Result<Booking, BookingError> {
        let (booking, changed) = retry::run(&self.retry, "cancel_booking", || {
            self.attempt_transition(operator_id, booking_id, BookingStatus::Cancelled)
        })
        .await?;

        if changed {
            info!("Booking {} cancelled, {} spots released", booking.booking_reference, booking.num_guests);
        } else {
            debug!("Booking {} already cancelled", booking.booking_reference);
        }
        Ok(booking)
    }

    /// Runs one transaction. The flag is false when the booking was already in `next`.
    async fn attempt_transition(
        &self,
        operator_id: Uuid,
        booking_id: Uuid,
        next: BookingStatus,
    ) -> Result<(Booking, bool), AttemptError> {
        let mut tx = self.store.begin().await?;

        let (mut booking, owner_id) = tx
            .lock_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;

        if owner_id != operator_id {
            return Err(BookingError::Unauthorized.into());
        }

        if booking.booking_status == next {
            return Ok((booking, false));
        }

        if !booking.booking_status.can_transition_to(next) {
            return Err(BookingError::InvalidTransition {
                from: booking.booking_status,
                to: next,
            }
            .into());
        }

        tx.update_booking_status(booking.id, next).await?;

        if next == BookingStatus::Cancelled {
            let context = tx
                .lock_schedule(booking.schedule_id)
                .await?
                .ok_or(BookingError::ScheduleNotFound)?;
            self.ledger.release(&mut *tx, &context.schedule, booking.num_guests).await?;
        }

        tx.commit().await?;

        booking.booking_status = next;
        booking.updated_at = Utc::now();
        Ok((booking, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReservationEngine;
    use crate::request::CreateBookingRequest;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use tourdesk_catalog::{NewTour, TourSchedule};
    use tourdesk_core::{CatalogRepository, LogDispatcher};
    use tourdesk_store::InMemoryStore;

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_repeat_cancel_reports_no_release() {
        let store = InMemoryStore::new();
        let operator_id = store.add_operator("Najd Walks", None).await;
        let tour = NewTour {
            title_en: Some("Diriyah at Dusk".to_string()),
            duration_hours: Some(2),
            max_capacity: Some(6),
            base_price_sar: Some(dec!(90.00)),
            ..Default::default()
        }
        .into_tour(operator_id)
        .unwrap();
        store.create_tour(&tour).await.unwrap();
        let schedule = TourSchedule::open(&tour, Utc::now() + Duration::days(3), None);
        store.create_schedule(&schedule).await.unwrap();

        let shared: Arc<dyn ReservationStore> = Arc::new(store.clone());
        let engine = ReservationEngine::new(shared.clone(), Arc::new(LogDispatcher), RetryPolicy::default());
        let manager = BookingManager::new(shared, RetryPolicy::default());

        let details = engine
            .create_booking(
                operator_id,
                CreateBookingRequest {
                    schedule_id: Some(schedule.id.to_string()),
                    customer_name: Some("Reem Al-Harbi".to_string()),
                    customer_email: Some("reem@example.com".to_string()),
                    num_guests: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let booking_id = details.booking.id;

        let (_, changed) = manager
            .attempt_transition(operator_id, booking_id, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert!(changed);

        let (booking, changed) = manager
            .attempt_transition(operator_id, booking_id, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert!(!changed);
        assert_eq!(booking.booking_status, BookingStatus::Cancelled);

        manager.cancel_booking(operator_id, booking_id).await.unwrap();
        assert!(logs_contain("already cancelled"));
        assert!(!logs_contain("spots released"));
        assert_eq!(store.schedule(schedule.id).await.unwrap().available_spots, 6);
    }
}
