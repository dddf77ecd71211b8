use chrono::Utc;
use std::sync::Arc;
use tourdesk_catalog::PriceQuote;
use tourdesk_core::{
    Booking, BookingDetails, BookingGuest, BookingStatus, NotificationDispatcher, OperatorContact, PaymentStatus,
    ReservationStore,
};
use tourdesk_shared::{BookingCreatedEvent, Masked};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{AttemptError, BookingError};
use crate::ledger::CapacityLedger;
use crate::reference;
use crate::request::{CreateBookingRequest, ValidatedBooking};
use crate::retry::{self, RetryPolicy};

/// Turns a validated request into a committed booking plus its seat allocation.
pub struct ReservationEngine {
    store: Arc<dyn ReservationStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    ledger: CapacityLedger,
    retry: RetryPolicy,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn ReservationStore>, dispatcher: Arc<dyn NotificationDispatcher>, retry: RetryPolicy) -> Self {
        Self {
            store,
            dispatcher,
            ledger: CapacityLedger,
            retry,
        }
    }

    /// Create a booking on behalf of `operator_id`.
    ///
    /// Validation happens before the store is touched. Everything after that
    /// (schedule lock, tenant check, seat reservation, pricing, booking and
    /// guest inserts) is one transaction, replayed on transient conflicts.
    /// The notification is dispatched after commit and never awaited.
    pub async fn create_booking(&self, operator_id: Uuid, request: CreateBookingRequest) -> Result<BookingDetails, BookingError> {
        let validated = request.validate()?;

        let (details, operator) =
            retry::run(&self.retry, "create_booking", || self.attempt_create(operator_id, &validated)).await?;

        info!(
            "Booking {} created on schedule {}: {} guests, {} {}",
            details.booking.booking_reference,
            details.schedule.id,
            details.booking.num_guests,
            details.booking.total_price_sar,
            tourdesk_catalog::CURRENCY
        );

        self.dispatch_created(&details, &operator);
        Ok(details)
    }

    async fn attempt_create(
        &self,
        operator_id: Uuid,
        request: &ValidatedBooking,
    ) -> Result<(BookingDetails, OperatorContact), AttemptError> {
        let mut tx = self.store.begin().await?;

        let mut context = tx
            .lock_schedule(request.schedule_id)
            .await?
            .ok_or(BookingError::ScheduleNotFound)?;

        if !context.is_owned_by(operator_id) {
            return Err(BookingError::Unauthorized.into());
        }

        let outcome = self
            .ledger
            .try_reserve(&mut *tx, &context.schedule, request.num_guests)
            .await?;

        let quote = PriceQuote::for_schedule(&context.tour, &context.schedule, request.num_guests)
            .map_err(|e| BookingError::Unexpected(e.to_string()))?;

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            schedule_id: context.schedule.id,
            customer_name: request.customer_name.clone(),
            customer_email: Masked::new(request.customer_email.clone()),
            customer_phone: request.customer_phone.clone().map(Masked::new),
            num_guests: request.num_guests,
            total_price_sar: quote.total_price,
            booking_status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            booking_reference: reference::generate(),
            booking_notes: request.booking_notes.clone(),
            created_at: now,
            updated_at: now,
        };
        tx.insert_booking(&booking).await?;

        let guests: Vec<BookingGuest> = request
            .guests
            .iter()
            .map(|g| BookingGuest {
                id: Uuid::new_v4(),
                booking_id: booking.id,
                guest_name: g.name.clone(),
                guest_age: g.age,
                guest_nationality: g.nationality.clone(),
            })
            .collect();
        if !guests.is_empty() {
            tx.insert_guests(&guests).await?;
        }

        tx.commit().await?;

        context.schedule.available_spots = outcome.remaining_spots;
        context.schedule.status = tourdesk_catalog::capacity::status_for(context.schedule.status, outcome.remaining_spots);

        Ok((
            BookingDetails {
                booking,
                guests,
                schedule: context.schedule,
                tour: context.tour,
            },
            context.operator,
        ))
    }

    fn dispatch_created(&self, details: &BookingDetails, operator: &OperatorContact) {
        let event = created_event(details, operator);
        let dispatcher = Arc::clone(&self.dispatcher);

        tokio::spawn(async move {
            if let Err(e) = dispatcher.notify_booking_created(&event).await {
                error!("Failed to send booking notifications for {}: {}", event.booking_reference, e);
            }
        });
    }
}

fn created_event(details: &BookingDetails, operator: &OperatorContact) -> BookingCreatedEvent {
    let booking = &details.booking;
    BookingCreatedEvent {
        booking_id: booking.id,
        booking_reference: booking.booking_reference.clone(),
        schedule_id: details.schedule.id,
        tour_id: details.tour.id,
        operator_id: operator.id,
        tour_title: details.tour.title_en.clone(),
        tour_title_ar: details.tour.title_ar.clone(),
        departure_at: details.schedule.departure_datetime,
        num_guests: booking.num_guests,
        total_price: booking.total_price_sar,
        currency: tourdesk_catalog::CURRENCY.to_string(),
        meeting_point: details.tour.meeting_point.clone(),
        meeting_point_instructions: details.tour.meeting_point_instructions.clone(),
        customer_name: booking.customer_name.clone(),
        customer_email: booking.customer_email.clone(),
        customer_phone: booking.customer_phone.clone(),
        operator_name: operator.company_name.clone(),
        operator_email: operator.contact_email.clone(),
        timestamp: Utc::now().timestamp(),
    }
}
