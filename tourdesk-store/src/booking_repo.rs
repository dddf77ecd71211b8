use async_trait::async_trait;
use sqlx::PgPool;
use tourdesk_catalog::{Tour, TourSchedule};
use tourdesk_core::{Booking, BookingDetails, BookingFilter, BookingGuest, BookingRepository, Page, StoreResult};
use uuid::Uuid;

use crate::database::map_sqlx_error;
use crate::rows::{BookingRow, GuestRow, ScheduleRow, TourRow, BOOKING_COLUMNS, SCHEDULE_COLUMNS, TOUR_COLUMNS};

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_details(&self, booking: Booking) -> StoreResult<BookingDetails> {
        let guests: Vec<GuestRow> = sqlx::query_as(
            r#"
            SELECT id, booking_id, guest_name, guest_age, guest_nationality
            FROM booking_guests WHERE booking_id = $1
            ORDER BY guest_name
            "#,
        )
        .bind(booking.id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let sql = format!("SELECT {} FROM tour_schedules WHERE id = $1", SCHEDULE_COLUMNS);
        let schedule: TourSchedule = sqlx::query_as::<_, ScheduleRow>(&sql)
            .bind(booking.schedule_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .try_into()?;

        let sql = format!("SELECT {} FROM tours WHERE id = $1", TOUR_COLUMNS);
        let tour: Tour = sqlx::query_as::<_, TourRow>(&sql)
            .bind(schedule.tour_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .into();

        Ok(BookingDetails {
            booking,
            guests: guests.into_iter().map(BookingGuest::from).collect(),
            schedule,
            tour,
        })
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn get_booking(&self, operator_id: Uuid, booking_id: Uuid) -> StoreResult<Option<BookingDetails>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM bookings b
            JOIN tour_schedules s ON s.id = b.schedule_id
            JOIN tours t ON t.id = s.tour_id
            WHERE b.id = $1 AND t.operator_id = $2
            "#,
            BOOKING_COLUMNS
        );
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .bind(operator_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Some(self.load_details(row.try_into()?).await?)),
            None => Ok(None),
        }
    }

    async fn list_bookings(&self, operator_id: Uuid, filter: &BookingFilter) -> StoreResult<Page<BookingDetails>> {
        let booking_status = filter.booking_status.map(|s| s.as_str());
        let payment_status = filter.payment_status.map(|s| s.as_str());

        let sql = format!(
            r#"
            SELECT {}
            FROM bookings b
            JOIN tour_schedules s ON s.id = b.schedule_id
            JOIN tours t ON t.id = s.tour_id
            WHERE t.operator_id = $1
              AND ($2::TEXT IS NULL OR b.booking_status = $2)
              AND ($3::TEXT IS NULL OR b.payment_status = $3)
            ORDER BY b.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            BOOKING_COLUMNS
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(operator_id)
            .bind(booking_status)
            .bind(payment_status)
            .bind(filter.page.limit as i64)
            .bind(filter.page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM bookings b
            JOIN tour_schedules s ON s.id = b.schedule_id
            JOIN tours t ON t.id = s.tour_id
            WHERE t.operator_id = $1
              AND ($2::TEXT IS NULL OR b.booking_status = $2)
              AND ($3::TEXT IS NULL OR b.payment_status = $3)
            "#,
        )
        .bind(operator_id)
        .bind(booking_status)
        .bind(payment_status)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(self.load_details(row.try_into()?).await?);
        }

        Ok(Page::new(items, filter.page, total.max(0) as u64))
    }
}
