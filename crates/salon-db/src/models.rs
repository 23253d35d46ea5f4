use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored appointment request.
///
/// Serialized with `createdAt` in camelCase to match the public JSON API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub service: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Validated input for a new booking. Everything but the server-assigned
/// `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub service: String,
    #[serde(default)]
    pub message: String,
}

impl NewBooking {
    /// Attach an id and creation time, producing the stored record.
    pub fn into_booking(self, id: i64, created_at: DateTime<Utc>) -> Booking {
        Booking {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            date: self.date,
            time: self.time,
            service: self.service,
            message: self.message,
            created_at,
        }
    }
}
