use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::error::BookingError;

static EMAIL_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn email_regex() -> &'static regex::Regex {
    EMAIL_REGEX.get_or_init(|| regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Inbound booking request as sent by the HTTP layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub schedule_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub num_guests: Option<i64>,
    pub guests: Option<Vec<GuestInput>>,
    pub booking_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInput {
    pub name: String,
    pub age: Option<i32>,
    pub nationality: Option<String>,
}

/// Request that passed every check that needs no store access.
#[derive(Debug, Clone)]
pub struct ValidatedBooking {
    pub schedule_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub num_guests: i32,
    pub guests: Vec<GuestInput>,
    pub booking_notes: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CreateBookingRequest {
    pub fn validate(self) -> Result<ValidatedBooking, BookingError> {
        let schedule_id = non_blank(self.schedule_id);
        let customer_name = non_blank(self.customer_name);
        let customer_email = non_blank(self.customer_email);

        // A zero guest count is reported as missing, like an absent one.
        let (schedule_id, customer_name, customer_email, num_guests) =
            match (schedule_id, customer_name, customer_email, self.num_guests.filter(|n| *n != 0)) {
                (Some(s), Some(n), Some(e), Some(g)) => (s, n, e, g),
                _ => return Err(BookingError::MissingFields),
            };

        if !is_valid_email(&customer_email) {
            return Err(BookingError::InvalidEmailFormat);
        }

        let num_guests = i32::try_from(num_guests)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or(BookingError::InvalidGuestCount)?;

        // An id that cannot parse cannot name an existing schedule.
        let schedule_id = Uuid::parse_str(&schedule_id).map_err(|_| BookingError::ScheduleNotFound)?;

        let mut guests = Vec::new();
        for guest in self.guests.unwrap_or_default() {
            let name = guest.name.trim().to_string();
            if name.is_empty() {
                return Err(BookingError::MissingFields);
            }
            guests.push(GuestInput {
                name,
                age: guest.age,
                nationality: non_blank(guest.nationality),
            });
        }

        Ok(ValidatedBooking {
            schedule_id,
            customer_name,
            customer_email,
            customer_phone: non_blank(self.customer_phone),
            num_guests,
            guests,
            booking_notes: non_blank(self.booking_notes),
        })
    }
}
