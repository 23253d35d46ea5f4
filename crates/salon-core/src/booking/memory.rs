//! Process-local booking store. Contents are lost on restart.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use salon_db::models::{Booking, NewBooking};

use super::BookingStore;

#[derive(Debug)]
struct Inner {
    bookings: Vec<Booking>,
    next_id: i64,
}

/// In-memory [`BookingStore`] backed by a vector in insertion order.
#[derive(Debug)]
pub struct MemoryBookingStore {
    inner: RwLock<Inner>,
    now: fn() -> DateTime<Utc>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Use `now` to stamp `created_at` instead of the wall clock.
    pub fn with_clock(now: fn() -> DateTime<Utc>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                bookings: Vec::new(),
                next_id: 1,
            }),
            now,
        }
    }
}

impl Default for MemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, new: NewBooking) -> Result<Booking> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let booking = new.into_booking(id, (self.now)());
        inner.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn list(&self) -> Result<Vec<Booking>> {
        let mut bookings = self.inner.read().await.bookings.clone();
        // Stable sort: equal timestamps stay in insertion order.
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.bookings.iter().position(|b| b.id == id) {
            Some(index) => {
                inner.bookings.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
