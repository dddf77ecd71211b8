use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tourdesk_catalog::{Tour, TourSchedule};
use tourdesk_shared::Masked;
use uuid::Uuid;

use crate::StoreError;

/// Booking lifecycle. `Pending` is the only state a booking is created in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Forward transitions recognised by the platform.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(StoreError::Database(format!("unknown booking status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(StoreError::Database(format!("unknown payment status '{}'", other))),
        }
    }
}

/// A customer's reservation against one schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub customer_name: String,
    pub customer_email: Masked<String>,
    pub customer_phone: Option<Masked<String>>,
    pub num_guests: i32,
    pub total_price_sar: Decimal,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub booking_reference: String,
    pub booking_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named companion attached to a booking. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingGuest {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub guest_name: String,
    pub guest_age: Option<i32>,
    pub guest_nationality: Option<String>,
}

/// Booking with everything a client needs to render it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub guests: Vec<BookingGuest>,
    pub schedule: TourSchedule,
    pub tour: Tour,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorContact {
    pub id: Uuid,
    pub company_name: String,
    pub contact_email: Option<String>,
}

/// A schedule loaded for update together with its tour and operator.
#[derive(Debug, Clone)]
pub struct ScheduleContext {
    pub schedule: TourSchedule,
    pub tour: Tour,
    pub operator: OperatorContact,
}

impl ScheduleContext {
    pub fn is_owned_by(&self, operator_id: Uuid) -> bool {
        self.tour.operator_id == operator_id
    }
}
