//! Process-local store backing the engine and API test suites.
//!
//! A transaction holds the store mutex for its whole lifetime and works on a
//! copy of the state. `commit` swaps the copy in. Dropping the transaction
//! leaves the shared state untouched.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tourdesk_catalog::{capacity, CapacityError, ScheduleStatus, Tour, TourSchedule};
use tourdesk_core::{
    Booking, BookingDetails, BookingFilter, BookingGuest, BookingRepository, BookingStatus, CatalogRepository,
    OperatorContact, Page, ReservationStore, ReservationTx, ScheduleContext, StoreError, StoreResult, TourFilter,
};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    operators: HashMap<Uuid, OperatorContact>,
    tours: HashMap<Uuid, Tour>,
    schedules: HashMap<Uuid, TourSchedule>,
    bookings: HashMap<Uuid, Booking>,
    guests: Vec<BookingGuest>,
}

impl MemoryState {
    fn details(&self, booking: &Booking) -> StoreResult<BookingDetails> {
        let schedule = self
            .schedules
            .get(&booking.schedule_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("schedule {}", booking.schedule_id)))?;
        let tour = self
            .tours
            .get(&schedule.tour_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("tour {}", schedule.tour_id)))?;
        let mut guests: Vec<BookingGuest> = self
            .guests
            .iter()
            .filter(|g| g.booking_id == booking.id)
            .cloned()
            .collect();
        guests.sort_by(|a, b| a.guest_name.cmp(&b.guest_name));

        Ok(BookingDetails {
            booking: booking.clone(),
            guests,
            schedule,
            tour,
        })
    }

    fn owner_of(&self, booking: &Booking) -> Option<Uuid> {
        let schedule = self.schedules.get(&booking.schedule_id)?;
        self.tours.get(&schedule.tour_id).map(|t| t.operator_id)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operator account and return its id.
    pub async fn add_operator(&self, company_name: &str, contact_email: Option<&str>) -> Uuid {
        let operator = OperatorContact {
            id: Uuid::new_v4(),
            company_name: company_name.to_string(),
            contact_email: contact_email.map(str::to_string),
        };
        let id = operator.id;
        self.state.lock().await.operators.insert(id, operator);
        id
    }

    pub async fn schedule(&self, schedule_id: Uuid) -> Option<TourSchedule> {
        self.state.lock().await.schedules.get(&schedule_id).cloned()
    }

    pub async fn bookings_for_schedule(&self, schedule_id: Uuid) -> Vec<Booking> {
        self.state
            .lock()
            .await
            .bookings
            .values()
            .filter(|b| b.schedule_id == schedule_id)
            .cloned()
            .collect()
    }

    pub async fn guests_for(&self, booking_id: Uuid) -> Vec<BookingGuest> {
        self.state
            .lock()
            .await
            .guests
            .iter()
            .filter(|g| g.booking_id == booking_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn ReservationTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn capacity_to_store(err: CapacityError) -> StoreError {
    StoreError::Database(err.to_string())
}

#[async_trait]
impl ReservationTx for MemoryTx {
    async fn lock_schedule(&mut self, schedule_id: Uuid) -> StoreResult<Option<ScheduleContext>> {
        let Some(schedule) = self.working.schedules.get(&schedule_id).cloned() else {
            return Ok(None);
        };
        let tour = self
            .working
            .tours
            .get(&schedule.tour_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("tour {}", schedule.tour_id)))?;
        let operator = self
            .working
            .operators
            .get(&tour.operator_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("operator {}", tour.operator_id)))?;

        Ok(Some(ScheduleContext { schedule, tour, operator }))
    }

    async fn take_spots(&mut self, schedule_id: Uuid, quantity: i32) -> StoreResult<Option<i32>> {
        let Some(schedule) = self.working.schedules.get_mut(&schedule_id) else {
            return Ok(None);
        };
        match capacity::reserve(schedule.available_spots, quantity) {
            Ok(remaining) => {
                schedule.available_spots = remaining;
                Ok(Some(remaining))
            }
            Err(CapacityError::Insufficient { .. }) => Ok(None),
            Err(e) => Err(capacity_to_store(e)),
        }
    }

    async fn available_spots(&mut self, schedule_id: Uuid) -> StoreResult<Option<i32>> {
        Ok(self.working.schedules.get(&schedule_id).map(|s| s.available_spots))
    }

    async fn release_spots(&mut self, schedule_id: Uuid, quantity: i32) -> StoreResult<Option<i32>> {
        let Some(schedule) = self.working.schedules.get(&schedule_id) else {
            return Ok(None);
        };
        let max_capacity = self
            .working
            .tours
            .get(&schedule.tour_id)
            .map(|t| t.max_capacity)
            .ok_or_else(|| StoreError::NotFound(format!("tour {}", schedule.tour_id)))?;
        let restored = capacity::release(schedule.available_spots, quantity, max_capacity).map_err(capacity_to_store)?;

        if let Some(schedule) = self.working.schedules.get_mut(&schedule_id) {
            schedule.available_spots = restored;
        }
        Ok(Some(restored))
    }

    async fn set_schedule_status(&mut self, schedule_id: Uuid, status: ScheduleStatus) -> StoreResult<()> {
        if let Some(schedule) = self.working.schedules.get_mut(&schedule_id) {
            schedule.status = status;
        }
        Ok(())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        if self
            .working
            .bookings
            .values()
            .any(|b| b.booking_reference == booking.booking_reference)
        {
            return Err(StoreError::DuplicateReference(booking.booking_reference.clone()));
        }
        if !self.working.schedules.contains_key(&booking.schedule_id) {
            return Err(StoreError::Database(format!("schedule {} does not exist", booking.schedule_id)));
        }
        self.working.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn insert_guests(&mut self, guests: &[BookingGuest]) -> StoreResult<()> {
        for guest in guests {
            if !self.working.bookings.contains_key(&guest.booking_id) {
                return Err(StoreError::Database(format!("booking {} does not exist", guest.booking_id)));
            }
        }
        self.working.guests.extend_from_slice(guests);
        Ok(())
    }

    async fn lock_booking(&mut self, booking_id: Uuid) -> StoreResult<Option<(Booking, Uuid)>> {
        let Some(booking) = self.working.bookings.get(&booking_id) else {
            return Ok(None);
        };
        let owner = self
            .working
            .owner_of(booking)
            .ok_or_else(|| StoreError::NotFound(format!("tour of booking {}", booking_id)))?;
        Ok(Some((booking.clone(), owner)))
    }

    async fn update_booking_status(&mut self, booking_id: Uuid, status: BookingStatus) -> StoreResult<()> {
        let booking = self
            .working
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", booking_id)))?;
        booking.booking_status = status;
        booking.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn create_tour(&self, tour: &Tour) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.operators.contains_key(&tour.operator_id) {
            return Err(StoreError::NotFound(format!("operator {}", tour.operator_id)));
        }
        state.tours.insert(tour.id, tour.clone());
        Ok(())
    }

    async fn get_tour(&self, operator_id: Uuid, tour_id: Uuid) -> StoreResult<Option<Tour>> {
        let state = self.state.lock().await;
        Ok(state
            .tours
            .get(&tour_id)
            .filter(|t| t.operator_id == operator_id)
            .cloned())
    }

    async fn list_tours(&self, operator_id: Uuid, filter: &TourFilter) -> StoreResult<Page<Tour>> {
        let state = self.state.lock().await;
        let mut tours: Vec<Tour> = state
            .tours
            .values()
            .filter(|t| t.operator_id == operator_id)
            .filter(|t| filter.is_active.map_or(true, |active| t.is_active == active))
            .cloned()
            .collect();
        tours.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = tours.len() as u64;
        let items = tours
            .into_iter()
            .skip(filter.page.offset() as usize)
            .take(filter.page.limit as usize)
            .collect();
        Ok(Page::new(items, filter.page, total))
    }

    async fn update_tour(&self, tour: &Tour) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.tours.get_mut(&tour.id) {
            Some(existing) if existing.operator_id == tour.operator_id => {
                *existing = Tour { created_at: existing.created_at, ..tour.clone() };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn archive_tour(&self, operator_id: Uuid, tour_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.tours.get_mut(&tour_id) {
            Some(tour) if tour.operator_id == operator_id => {
                tour.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_schedule(&self, schedule: &TourSchedule) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.tours.contains_key(&schedule.tour_id) {
            return Err(StoreError::NotFound(format!("tour {}", schedule.tour_id)));
        }
        state.schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn list_schedules(&self, tour_id: Uuid) -> StoreResult<Vec<TourSchedule>> {
        let state = self.state.lock().await;
        let mut schedules: Vec<TourSchedule> = state
            .schedules
            .values()
            .filter(|s| s.tour_id == tour_id)
            .cloned()
            .collect();
        schedules.sort_by_key(|s| s.departure_datetime);
        Ok(schedules)
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn get_booking(&self, operator_id: Uuid, booking_id: Uuid) -> StoreResult<Option<BookingDetails>> {
        let state = self.state.lock().await;
        match state.bookings.get(&booking_id) {
            Some(booking) if state.owner_of(booking) == Some(operator_id) => Ok(Some(state.details(booking)?)),
            _ => Ok(None),
        }
    }

    async fn list_bookings(&self, operator_id: Uuid, filter: &BookingFilter) -> StoreResult<Page<BookingDetails>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<&Booking> = state
            .bookings
            .values()
            .filter(|b| state.owner_of(b) == Some(operator_id))
            .filter(|b| filter.matches(b))
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = bookings.len() as u64;
        let items = bookings
            .into_iter()
            .skip(filter.page.offset() as usize)
            .take(filter.page.limit as usize)
            .map(|b| state.details(b))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, filter.page, total))
    }
}
