use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tourdesk_catalog::{ScheduleStatus, Tour, TourSchedule};
use tourdesk_core::{
    Booking, BookingGuest, BookingStatus, OperatorContact, ReservationStore, ReservationTx, ScheduleContext,
    StoreResult,
};
use uuid::Uuid;

use crate::database::map_sqlx_error;
use crate::rows::{OperatorRow, OwnedBookingRow, ScheduleRow, TourRow, BOOKING_COLUMNS, SCHEDULE_COLUMNS, TOUR_COLUMNS};

/// PostgreSQL side of the reservation transaction.
///
/// Runs at READ COMMITTED. The schedule row is locked with `FOR UPDATE`
/// and the seat decrement is a conditional `UPDATE`, so concurrent
/// reservations on one schedule serialize on the row.
pub struct PgReservationStore {
    pool: PgPool,
    statement_timeout_ms: u64,
}

impl PgReservationStore {
    pub fn new(pool: PgPool, statement_timeout_ms: u64) -> Self {
        Self { pool, statement_timeout_ms }
    }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn begin(&self) -> StoreResult<Box<dyn ReservationTx>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // SET does not take bind parameters; the value is a plain integer.
        let timeout = format!("SET LOCAL statement_timeout = {}", self.statement_timeout_ms);
        sqlx::query(&timeout).execute(&mut *tx).await.map_err(map_sqlx_error)?;
        let lock_timeout = format!("SET LOCAL lock_timeout = {}", self.statement_timeout_ms);
        sqlx::query(&lock_timeout).execute(&mut *tx).await.map_err(map_sqlx_error)?;

        Ok(Box::new(PgReservationTx { tx }))
    }
}

pub struct PgReservationTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReservationTx for PgReservationTx {
    async fn lock_schedule(&mut self, schedule_id: Uuid) -> StoreResult<Option<ScheduleContext>> {
        let sql = format!("SELECT {} FROM tour_schedules WHERE id = $1 FOR UPDATE", SCHEDULE_COLUMNS);
        let row: Option<ScheduleRow> = sqlx::query_as(&sql)
            .bind(schedule_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        let schedule: TourSchedule = match row {
            Some(row) => row.try_into()?,
            None => return Ok(None),
        };

        let sql = format!("SELECT {} FROM tours WHERE id = $1", TOUR_COLUMNS);
        let tour: Tour = sqlx::query_as::<_, TourRow>(&sql)
            .bind(schedule.tour_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?
            .into();

        let operator: OperatorContact = sqlx::query_as::<_, OperatorRow>(
            "SELECT id, company_name, contact_email FROM operators WHERE id = $1",
        )
        .bind(tour.operator_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?
        .into();

        Ok(Some(ScheduleContext { schedule, tour, operator }))
    }

    async fn take_spots(&mut self, schedule_id: Uuid, quantity: i32) -> StoreResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE tour_schedules
            SET available_spots = available_spots - $2
            WHERE id = $1 AND available_spots >= $2
            RETURNING available_spots
            "#,
        )
        .bind(schedule_id)
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn available_spots(&mut self, schedule_id: Uuid) -> StoreResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>("SELECT available_spots FROM tour_schedules WHERE id = $1")
            .bind(schedule_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn release_spots(&mut self, schedule_id: Uuid, quantity: i32) -> StoreResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE tour_schedules s
            SET available_spots = LEAST(s.available_spots + $2, t.max_capacity)
            FROM tours t
            WHERE s.id = $1 AND t.id = s.tour_id
            RETURNING s.available_spots
            "#,
        )
        .bind(schedule_id)
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn set_schedule_status(&mut self, schedule_id: Uuid, status: ScheduleStatus) -> StoreResult<()> {
        sqlx::query("UPDATE tour_schedules SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(schedule_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, schedule_id, customer_name, customer_email, customer_phone, num_guests,
                                  total_price_sar, booking_status, payment_status, booking_reference,
                                  booking_notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(booking.id)
        .bind(booking.schedule_id)
        .bind(&booking.customer_name)
        .bind(booking.customer_email.expose())
        .bind(booking.customer_phone.as_ref().map(|p| p.expose().clone()))
        .bind(booking.num_guests)
        .bind(booking.total_price_sar)
        .bind(booking.booking_status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.booking_reference)
        .bind(&booking.booking_notes)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_guests(&mut self, guests: &[BookingGuest]) -> StoreResult<()> {
        for guest in guests {
            sqlx::query(
                r#"
                INSERT INTO booking_guests (id, booking_id, guest_name, guest_age, guest_nationality)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(guest.id)
            .bind(guest.booking_id)
            .bind(&guest.guest_name)
            .bind(guest.guest_age)
            .bind(&guest.guest_nationality)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    async fn lock_booking(&mut self, booking_id: Uuid) -> StoreResult<Option<(Booking, Uuid)>> {
        let sql = format!(
            r#"
            SELECT {}, t.operator_id
            FROM bookings b
            JOIN tour_schedules s ON s.id = b.schedule_id
            JOIN tours t ON t.id = s.tour_id
            WHERE b.id = $1
            FOR UPDATE OF b
            "#,
            BOOKING_COLUMNS
        );
        let row: Option<OwnedBookingRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Some((row.booking.try_into()?, row.operator_id))),
            None => Ok(None),
        }
    }

    async fn update_booking_status(&mut self, booking_id: Uuid, status: BookingStatus) -> StoreResult<()> {
        sqlx::query("UPDATE bookings SET booking_status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(booking_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}
