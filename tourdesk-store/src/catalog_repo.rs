use async_trait::async_trait;
use sqlx::PgPool;
use tourdesk_catalog::{Tour, TourSchedule};
use tourdesk_core::{CatalogRepository, Page, StoreResult, TourFilter};
use uuid::Uuid;

use crate::database::map_sqlx_error;
use crate::rows::{ScheduleRow, TourRow, SCHEDULE_COLUMNS, TOUR_COLUMNS};

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn create_tour(&self, tour: &Tour) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tours (id, operator_id, title_en, title_ar, duration_hours, max_capacity, base_price_sar,
                               meeting_point, meeting_point_instructions, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(tour.id)
        .bind(tour.operator_id)
        .bind(&tour.title_en)
        .bind(&tour.title_ar)
        .bind(tour.duration_hours)
        .bind(tour.max_capacity)
        .bind(tour.base_price_sar)
        .bind(&tour.meeting_point)
        .bind(&tour.meeting_point_instructions)
        .bind(tour.is_active)
        .bind(tour.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_tour(&self, operator_id: Uuid, tour_id: Uuid) -> StoreResult<Option<Tour>> {
        let sql = format!("SELECT {} FROM tours WHERE id = $1 AND operator_id = $2", TOUR_COLUMNS);
        let row: Option<TourRow> = sqlx::query_as(&sql)
            .bind(tour_id)
            .bind(operator_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Tour::from))
    }

    async fn list_tours(&self, operator_id: Uuid, filter: &TourFilter) -> StoreResult<Page<Tour>> {
        // `$2 IS NULL` lets one statement serve both the filtered and unfiltered listing.
        let sql = format!(
            r#"
            SELECT {} FROM tours
            WHERE operator_id = $1 AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            TOUR_COLUMNS
        );
        let rows: Vec<TourRow> = sqlx::query_as(&sql)
            .bind(operator_id)
            .bind(filter.is_active)
            .bind(filter.page.limit as i64)
            .bind(filter.page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tours WHERE operator_id = $1 AND ($2::BOOLEAN IS NULL OR is_active = $2)",
        )
        .bind(operator_id)
        .bind(filter.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = rows.into_iter().map(Tour::from).collect();
        Ok(Page::new(items, filter.page, total.max(0) as u64))
    }

    async fn update_tour(&self, tour: &Tour) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tours
            SET title_en = $3, title_ar = $4, duration_hours = $5, max_capacity = $6,
                base_price_sar = $7, meeting_point = $8, meeting_point_instructions = $9, is_active = $10
            WHERE id = $1 AND operator_id = $2
            "#,
        )
        .bind(tour.id)
        .bind(tour.operator_id)
        .bind(&tour.title_en)
        .bind(&tour.title_ar)
        .bind(tour.duration_hours)
        .bind(tour.max_capacity)
        .bind(tour.base_price_sar)
        .bind(&tour.meeting_point)
        .bind(&tour.meeting_point_instructions)
        .bind(tour.is_active)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn archive_tour(&self, operator_id: Uuid, tour_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE tours SET is_active = FALSE WHERE id = $1 AND operator_id = $2")
            .bind(tour_id)
            .bind(operator_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_schedule(&self, schedule: &TourSchedule) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tour_schedules (id, tour_id, departure_datetime, available_spots, price_override, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.tour_id)
        .bind(schedule.departure_datetime)
        .bind(schedule.available_spots)
        .bind(schedule.price_override)
        .bind(schedule.status.as_str())
        .bind(schedule.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_schedules(&self, tour_id: Uuid) -> StoreResult<Vec<TourSchedule>> {
        let sql = format!(
            "SELECT {} FROM tour_schedules WHERE tour_id = $1 ORDER BY departure_datetime ASC",
            SCHEDULE_COLUMNS
        );
        let rows: Vec<ScheduleRow> = sqlx::query_as(&sql)
            .bind(tour_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(TourSchedule::try_from).collect()
    }
}
