use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A bookable service offering. Reference data: created by staff, never
/// hard-deleted while bookings point at it (deactivated instead).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

impl Service {
    /// Deposit is 50% of the service price, rounded up to the next cent for
    /// odd prices.
    pub fn deposit_cents(&self) -> i64 {
        (self.price_cents + 1) / 2
    }
}
