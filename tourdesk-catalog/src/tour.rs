use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Settlement currency for every tour price.
pub const CURRENCY: &str = "SAR";

/// Operator-owned product definition.
///
/// `max_capacity` is treated as immutable once schedules exist; the capacity
/// ledger relies on it as the ceiling when seats are released.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: Uuid,
    pub operator_id: Uuid,
    pub title_en: String,
    pub title_ar: Option<String>,
    pub duration_hours: i32,
    pub max_capacity: i32,
    pub base_price_sar: Decimal,
    pub meeting_point: Option<String>,
    pub meeting_point_instructions: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Departure state. Informational: the seat counter is the only capacity gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Available,
    Full,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Available => "available",
            ScheduleStatus::Full => "full",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ScheduleStatus::Available),
            "full" => Ok(ScheduleStatus::Full),
            "cancelled" => Ok(ScheduleStatus::Cancelled),
            other => Err(CatalogError::UnknownStatus(other.to_string())),
        }
    }
}

/// One bookable departure of a tour with its own seat counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TourSchedule {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub departure_datetime: DateTime<Utc>,
    pub available_spots: i32,
    pub price_override: Option<Decimal>,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
}

impl TourSchedule {
    /// A fresh departure starts with the whole tour capacity available.
    pub fn open(tour: &Tour, departure_datetime: DateTime<Utc>, price_override: Option<Decimal>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tour_id: tour.id,
            departure_datetime,
            available_spots: tour.max_capacity,
            price_override,
            status: ScheduleStatus::Available,
            created_at: Utc::now(),
        }
    }
}

/// Payload for creating a tour.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTour {
    pub title_en: Option<String>,
    pub title_ar: Option<String>,
    pub duration_hours: Option<i32>,
    pub max_capacity: Option<i32>,
    pub base_price_sar: Option<Decimal>,
    pub meeting_point: Option<String>,
    pub meeting_point_instructions: Option<String>,
}

impl NewTour {
    /// Validate the payload and build the tour owned by `operator_id`.
    pub fn into_tour(self, operator_id: Uuid) -> Result<Tour, CatalogError> {
        let title_en = self
            .title_en
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let (title_en, duration_hours, max_capacity, base_price_sar) =
            match (title_en, self.duration_hours, self.max_capacity, self.base_price_sar) {
                (Some(t), Some(d), Some(c), Some(p)) => (t, d, c, p),
                _ => {
                    return Err(CatalogError::MissingFields(
                        "titleEn, durationHours, maxCapacity, and basePriceSar are required".to_string(),
                    ))
                }
            };

        if max_capacity <= 0 {
            return Err(CatalogError::Invalid("maxCapacity must be greater than zero".to_string()));
        }
        if duration_hours <= 0 {
            return Err(CatalogError::Invalid("durationHours must be greater than zero".to_string()));
        }
        if base_price_sar.is_sign_negative() {
            return Err(CatalogError::Invalid("basePriceSar must not be negative".to_string()));
        }

        Ok(Tour {
            id: Uuid::new_v4(),
            operator_id,
            title_en,
            title_ar: self.title_ar.filter(|t| !t.trim().is_empty()),
            duration_hours,
            max_capacity,
            base_price_sar: base_price_sar.round_dp(2),
            meeting_point: self.meeting_point,
            meeting_point_instructions: self.meeting_point_instructions,
            is_active: true,
            created_at: Utc::now(),
        })
    }
}

/// Payload for creating a departure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSchedule {
    pub departure_datetime: Option<DateTime<Utc>>,
    pub price_override: Option<Decimal>,
}

impl NewSchedule {
    pub fn into_schedule(self, tour: &Tour) -> Result<TourSchedule, CatalogError> {
        let departure = self
            .departure_datetime
            .ok_or_else(|| CatalogError::MissingFields("departureDatetime is required".to_string()))?;

        if let Some(price) = self.price_override {
            if price.is_sign_negative() {
                return Err(CatalogError::Invalid("priceOverride must not be negative".to_string()));
            }
        }

        Ok(TourSchedule::open(tour, departure, self.price_override.map(|p| p.round_dp(2))))
    }
}

/// Partial update of a tour. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourUpdate {
    pub title_en: Option<String>,
    pub title_ar: Option<String>,
    pub duration_hours: Option<i32>,
    pub max_capacity: Option<i32>,
    pub base_price_sar: Option<Decimal>,
    pub meeting_point: Option<String>,
    pub meeting_point_instructions: Option<String>,
    pub is_active: Option<bool>,
}

impl TourUpdate {
    /// Apply the update to `tour`. Capacity is frozen once the tour has
    /// departures, since their seat counters were opened against it.
    pub fn apply(self, tour: &mut Tour, has_schedules: bool) -> Result<(), CatalogError> {
        if let Some(max_capacity) = self.max_capacity {
            if max_capacity <= 0 {
                return Err(CatalogError::Invalid("maxCapacity must be greater than zero".to_string()));
            }
            if has_schedules && max_capacity != tour.max_capacity {
                return Err(CatalogError::Invalid(
                    "maxCapacity cannot change once the tour has schedules".to_string(),
                ));
            }
        }
        if matches!(self.duration_hours, Some(d) if d <= 0) {
            return Err(CatalogError::Invalid("durationHours must be greater than zero".to_string()));
        }
        if matches!(self.base_price_sar, Some(p) if p.is_sign_negative()) {
            return Err(CatalogError::Invalid("basePriceSar must not be negative".to_string()));
        }

        if let Some(title) = self.title_en {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(CatalogError::MissingFields("titleEn must not be blank".to_string()));
            }
            tour.title_en = title;
        }
        if let Some(title_ar) = self.title_ar {
            tour.title_ar = Some(title_ar).filter(|t| !t.trim().is_empty());
        }
        if let Some(duration_hours) = self.duration_hours {
            tour.duration_hours = duration_hours;
        }
        if let Some(max_capacity) = self.max_capacity {
            tour.max_capacity = max_capacity;
        }
        if let Some(price) = self.base_price_sar {
            tour.base_price_sar = price.round_dp(2);
        }
        if let Some(meeting_point) = self.meeting_point {
            tour.meeting_point = Some(meeting_point);
        }
        if let Some(instructions) = self.meeting_point_instructions {
            tour.meeting_point_instructions = Some(instructions);
        }
        if let Some(is_active) = self.is_active {
            tour.is_active = is_active;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    MissingFields(String),

    #[error("{0}")]
    Invalid(String),

    #[error("Unknown schedule status: {0}")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_tour() -> NewTour {
        NewTour {
            title_en: Some("AlUla Old Town Walk".to_string()),
            title_ar: None,
            duration_hours: Some(3),
            max_capacity: Some(12),
            base_price_sar: Some(dec!(150.00)),
            meeting_point: Some("Visitor centre".to_string()),
            meeting_point_instructions: None,
        }
    }

    #[test]
    fn test_new_tour_requires_core_fields() {
        let mut payload = new_tour();
        payload.max_capacity = None;
        let err = payload.into_tour(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingFields(_)));

        let mut payload = new_tour();
        payload.title_en = Some("   ".to_string());
        assert!(payload.into_tour(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_new_tour_rejects_zero_capacity() {
        let mut payload = new_tour();
        payload.max_capacity = Some(0);
        let err = payload.into_tour(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
    }

    #[test]
    fn test_update_applies_only_given_fields() {
        let mut tour = new_tour().into_tour(Uuid::new_v4()).unwrap();
        TourUpdate {
            base_price_sar: Some(dec!(175.5)),
            is_active: Some(false),
            ..Default::default()
        }
        .apply(&mut tour, true)
        .unwrap();

        assert_eq!(tour.base_price_sar, dec!(175.50));
        assert!(!tour.is_active);
        assert_eq!(tour.title_en, "AlUla Old Town Walk");
        assert_eq!(tour.max_capacity, 12);
    }

    #[test]
    fn test_update_freezes_capacity_once_scheduled() {
        let mut tour = new_tour().into_tour(Uuid::new_v4()).unwrap();
        let err = TourUpdate { max_capacity: Some(20), ..Default::default() }
            .apply(&mut tour, true)
            .unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
        assert_eq!(tour.max_capacity, 12);

        TourUpdate { max_capacity: Some(12), ..Default::default() }
            .apply(&mut tour, true)
            .unwrap();
        TourUpdate { max_capacity: Some(20), ..Default::default() }
            .apply(&mut tour, false)
            .unwrap();
        assert_eq!(tour.max_capacity, 20);
    }

    #[test]
    fn test_schedule_opens_with_full_capacity() {
        let operator_id = Uuid::new_v4();
        let tour = new_tour().into_tour(operator_id).unwrap();
        assert!(tour.is_active);

        let schedule = NewSchedule {
            departure_datetime: Some(Utc::now()),
            price_override: None,
        }
        .into_schedule(&tour)
        .unwrap();

        assert_eq!(schedule.tour_id, tour.id);
        assert_eq!(schedule.available_spots, 12);
        assert_eq!(schedule.status, ScheduleStatus::Available);
    }

    #[test]
    fn test_schedule_requires_departure() {
        let tour = new_tour().into_tour(Uuid::new_v4()).unwrap();
        let err = NewSchedule { departure_datetime: None, price_override: None }
            .into_schedule(&tour)
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingFields(_)));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [ScheduleStatus::Available, ScheduleStatus::Full, ScheduleStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<ScheduleStatus>().unwrap(), status);
        }
        assert!("sold_out".parse::<ScheduleStatus>().is_err());
    }
}
