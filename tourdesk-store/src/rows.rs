//! Row types shared by the PostgreSQL repositories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tourdesk_catalog::{ScheduleStatus, Tour, TourSchedule};
use tourdesk_core::{Booking, BookingGuest, OperatorContact, StoreError};
use tourdesk_shared::Masked;
use uuid::Uuid;

pub(crate) const TOUR_COLUMNS: &str = "id, operator_id, title_en, title_ar, duration_hours, max_capacity, \
     base_price_sar, meeting_point, meeting_point_instructions, is_active, created_at";

pub(crate) const SCHEDULE_COLUMNS: &str =
    "id, tour_id, departure_datetime, available_spots, price_override, status, created_at";

pub(crate) const BOOKING_COLUMNS: &str = "b.id, b.schedule_id, b.customer_name, b.customer_email, b.customer_phone, \
     b.num_guests, b.total_price_sar, b.booking_status, b.payment_status, b.booking_reference, \
     b.booking_notes, b.created_at, b.updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct TourRow {
    id: Uuid,
    operator_id: Uuid,
    title_en: String,
    title_ar: Option<String>,
    duration_hours: i32,
    max_capacity: i32,
    base_price_sar: Decimal,
    meeting_point: Option<String>,
    meeting_point_instructions: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<TourRow> for Tour {
    fn from(row: TourRow) -> Self {
        Tour {
            id: row.id,
            operator_id: row.operator_id,
            title_en: row.title_en,
            title_ar: row.title_ar,
            duration_hours: row.duration_hours,
            max_capacity: row.max_capacity,
            base_price_sar: row.base_price_sar,
            meeting_point: row.meeting_point,
            meeting_point_instructions: row.meeting_point_instructions,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ScheduleRow {
    id: Uuid,
    tour_id: Uuid,
    departure_datetime: DateTime<Utc>,
    available_spots: i32,
    price_override: Option<Decimal>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ScheduleRow> for TourSchedule {
    type Error = StoreError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ScheduleStatus>()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(TourSchedule {
            id: row.id,
            tour_id: row.tour_id,
            departure_datetime: row.departure_datetime,
            available_spots: row.available_spots,
            price_override: row.price_override,
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct OperatorRow {
    id: Uuid,
    company_name: String,
    contact_email: Option<String>,
}

impl From<OperatorRow> for OperatorContact {
    fn from(row: OperatorRow) -> Self {
        OperatorContact {
            id: row.id,
            company_name: row.company_name,
            contact_email: row.contact_email,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    id: Uuid,
    schedule_id: Uuid,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    num_guests: i32,
    total_price_sar: Decimal,
    booking_status: String,
    payment_status: String,
    booking_reference: String,
    booking_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            schedule_id: row.schedule_id,
            customer_name: row.customer_name,
            customer_email: Masked::new(row.customer_email),
            customer_phone: row.customer_phone.map(Masked::new),
            num_guests: row.num_guests,
            total_price_sar: row.total_price_sar,
            booking_status: row.booking_status.parse()?,
            payment_status: row.payment_status.parse()?,
            booking_reference: row.booking_reference,
            booking_notes: row.booking_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct GuestRow {
    id: Uuid,
    booking_id: Uuid,
    guest_name: String,
    guest_age: Option<i32>,
    guest_nationality: Option<String>,
}

impl From<GuestRow> for BookingGuest {
    fn from(row: GuestRow) -> Self {
        BookingGuest {
            id: row.id,
            booking_id: row.booking_id,
            guest_name: row.guest_name,
            guest_age: row.guest_age,
            guest_nationality: row.guest_nationality,
        }
    }
}

/// A booking row joined with the operator owning its tour.
#[derive(sqlx::FromRow)]
pub(crate) struct OwnedBookingRow {
    #[sqlx(flatten)]
    pub booking: BookingRow,
    pub operator_id: Uuid,
}
