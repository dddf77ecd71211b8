use async_trait::async_trait;
use tourdesk_shared::BookingCreatedEvent;

/// Receives committed bookings. Called from a detached task, so an error
/// here is logged by the caller and never reaches the booking result.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify_booking_created(&self, event: &BookingCreatedEvent) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
    #[error("Notification payload could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Dispatcher used when no broker is configured: records the booking in the log.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn notify_booking_created(&self, event: &BookingCreatedEvent) -> Result<(), NotificationError> {
        // Contact fields are Masked, so this never prints an address.
        tracing::info!(
            booking_reference = %event.booking_reference,
            tour = %event.tour_title,
            guests = event.num_guests,
            customer_email = %event.customer_email,
            operator = %event.operator_name,
            "Booking confirmation queued for {} and operator notification for {}",
            event.customer_name,
            event.operator_name
        );
        Ok(())
    }
}
