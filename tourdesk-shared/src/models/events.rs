use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::pii::Masked;

/// Published after a booking transaction commits.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub schedule_id: Uuid,
    pub tour_id: Uuid,
    pub operator_id: Uuid,
    pub tour_title: String,
    pub tour_title_ar: Option<String>,
    pub departure_at: DateTime<Utc>,
    pub num_guests: i32,
    pub total_price: Decimal,
    pub currency: String,
    pub meeting_point: Option<String>,
    pub meeting_point_instructions: Option<String>,
    pub customer_name: String,
    pub customer_email: Masked<String>,
    pub customer_phone: Option<Masked<String>>,
    pub operator_name: String,
    pub operator_email: Option<String>,
    pub timestamp: i64,
}
