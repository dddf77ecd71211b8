use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tour::{Tour, TourSchedule, CURRENCY};

/// Price of a booking, computed in exact decimal arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub unit_price: Decimal,
    pub num_guests: i32,
    pub total_price: Decimal,
    pub currency: String,
}

impl PriceQuote {
    /// The schedule override wins over the tour base price.
    pub fn for_schedule(tour: &Tour, schedule: &TourSchedule, num_guests: i32) -> Result<Self, PricingError> {
        if num_guests < 1 {
            return Err(PricingError::InvalidGuestCount(num_guests));
        }

        let unit_price = schedule.price_override.unwrap_or(tour.base_price_sar);
        let total_price = unit_price
            .checked_mul(Decimal::from(num_guests))
            .ok_or(PricingError::Overflow)?;

        Ok(Self {
            unit_price,
            num_guests,
            total_price,
            currency: CURRENCY.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Guest count must be at least 1, got {0}")]
    InvalidGuestCount(i32),

    #[error("Price calculation overflowed")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::ScheduleStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn tour(base: Decimal) -> Tour {
        Tour {
            id: Uuid::new_v4(),
            operator_id: Uuid::new_v4(),
            title_en: "Edge of the World".to_string(),
            title_ar: None,
            duration_hours: 8,
            max_capacity: 10,
            base_price_sar: base,
            meeting_point: None,
            meeting_point_instructions: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn schedule(tour: &Tour, price_override: Option<Decimal>) -> TourSchedule {
        TourSchedule {
            id: Uuid::new_v4(),
            tour_id: tour.id,
            departure_datetime: Utc::now(),
            available_spots: tour.max_capacity,
            price_override,
            status: ScheduleStatus::Available,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_base_price_times_guests_is_exact() {
        let tour = tour(dec!(150.00));
        let quote = PriceQuote::for_schedule(&tour, &schedule(&tour, None), 3).unwrap();
        assert_eq!(quote.unit_price, dec!(150.00));
        assert_eq!(quote.total_price, dec!(450.00));
        assert_eq!(quote.currency, "SAR");
    }

    #[test]
    fn test_override_takes_precedence() {
        let tour = tour(dec!(150.00));
        let quote = PriceQuote::for_schedule(&tour, &schedule(&tour, Some(dec!(99.99))), 3).unwrap();
        assert_eq!(quote.unit_price, dec!(99.99));
        assert_eq!(quote.total_price, dec!(299.97));
    }

    #[test]
    fn test_binary_float_drift_does_not_occur() {
        // 0.1 * 3 is 0.30000000000000004 in f64
        let tour = tour(dec!(0.10));
        let quote = PriceQuote::for_schedule(&tour, &schedule(&tour, None), 3).unwrap();
        assert_eq!(quote.total_price, dec!(0.30));
    }

    #[test]
    fn test_zero_guests_rejected() {
        let tour = tour(dec!(150.00));
        assert!(PriceQuote::for_schedule(&tour, &schedule(&tour, None), 0).is_err());
    }
}
