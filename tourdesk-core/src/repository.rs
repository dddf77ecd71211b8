use async_trait::async_trait;
use serde::Serialize;
use tourdesk_catalog::{ScheduleStatus, Tour, TourSchedule};
use uuid::Uuid;

use crate::booking::{Booking, BookingDetails, BookingGuest, BookingStatus, PaymentStatus, ScheduleContext};
use crate::StoreResult;

/// Entry point for the all-or-nothing unit of work behind reservations.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn ReservationTx>>;
}

/// One open transaction. Dropping it without `commit` rolls everything back.
///
/// `available_spots` is written only through `take_spots` and `release_spots`.
#[async_trait]
pub trait ReservationTx: Send {
    /// Load the schedule with its tour and operator, holding a row lock on
    /// the schedule until the transaction ends.
    async fn lock_schedule(&mut self, schedule_id: Uuid) -> StoreResult<Option<ScheduleContext>>;

    /// Conditional decrement: succeeds only when at least `quantity` seats
    /// remain. Returns the new counter, or `None` when the gate refused.
    async fn take_spots(&mut self, schedule_id: Uuid, quantity: i32) -> StoreResult<Option<i32>>;

    /// Counter as seen inside this transaction.
    async fn available_spots(&mut self, schedule_id: Uuid) -> StoreResult<Option<i32>>;

    /// Give seats back, capped at the tour capacity. Returns the new counter.
    async fn release_spots(&mut self, schedule_id: Uuid, quantity: i32) -> StoreResult<Option<i32>>;

    async fn set_schedule_status(&mut self, schedule_id: Uuid, status: ScheduleStatus) -> StoreResult<()>;

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn insert_guests(&mut self, guests: &[BookingGuest]) -> StoreResult<()>;

    /// Load a booking for update together with the operator owning its tour.
    async fn lock_booking(&mut self, booking_id: Uuid) -> StoreResult<Option<(Booking, Uuid)>>;

    async fn update_booking_status(&mut self, booking_id: Uuid, status: BookingStatus) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Operator-scoped tour and schedule management.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_tour(&self, tour: &Tour) -> StoreResult<()>;

    async fn get_tour(&self, operator_id: Uuid, tour_id: Uuid) -> StoreResult<Option<Tour>>;

    async fn list_tours(&self, operator_id: Uuid, filter: &TourFilter) -> StoreResult<Page<Tour>>;

    /// Overwrites the editable fields. Returns false when the tour is not the operator's.
    async fn update_tour(&self, tour: &Tour) -> StoreResult<bool>;

    /// Soft delete. Returns false when the tour is not the operator's.
    async fn archive_tour(&self, operator_id: Uuid, tour_id: Uuid) -> StoreResult<bool>;

    async fn create_schedule(&self, schedule: &TourSchedule) -> StoreResult<()>;

    /// Departures of a tour, earliest first.
    async fn list_schedules(&self, tour_id: Uuid) -> StoreResult<Vec<TourSchedule>>;
}

/// Read side for bookings. Reads here are advisory and never gate a write.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(&self, operator_id: Uuid, booking_id: Uuid) -> StoreResult<Option<BookingDetails>>;

    /// Newest first.
    async fn list_bookings(&self, operator_id: Uuid, filter: &BookingFilter) -> StoreResult<Page<BookingDetails>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TourFilter {
    pub page: PageRequest,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub page: PageRequest,
    pub booking_status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.booking_status.map_or(true, |s| booking.booking_status == s)
            && self.payment_status.map_or(true, |s| booking.payment_status == s)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        let limit = request.limit.max(1) as u64;
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}
