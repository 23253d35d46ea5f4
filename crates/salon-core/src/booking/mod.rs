//! Booking lifecycle: validation, storage and the service the API calls.
//!
//! Bookings are created once, listed newest first, and deleted by id. They
//! are never updated. Two interchangeable stores implement
//! [`BookingStore`]; which one is active is decided at startup.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use salon_db::models::{Booking, NewBooking};

use crate::error::{Result, SalonError};

pub use memory::MemoryBookingStore;
pub use postgres::PgBookingStore;

/// Message returned when any required booking field is absent or blank.
pub const MISSING_FIELDS: &str = "All required fields must be filled";

/// Message returned when a delete targets an id that does not exist.
pub const BOOKING_NOT_FOUND: &str = "Booking not found";

/// Persistence interface for bookings.
///
/// Implementations must hand out strictly increasing ids that are never
/// reused, even after deletes, and must return `list` ordered by
/// `created_at` descending with ties kept in insertion order.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Short backend name for logs (e.g. "memory", "postgres").
    fn backend(&self) -> &'static str;

    /// Append a booking, assigning its id and creation time.
    async fn create(&self, new: NewBooking) -> AnyResult<Booking>;

    /// All bookings, newest first.
    async fn list(&self) -> AnyResult<Vec<Booking>>;

    /// Remove a booking. Returns whether a record with that id existed.
    async fn delete(&self, id: i64) -> AnyResult<bool>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn BookingStore) {}
};

/// Raw booking submission as it arrives from a client.
///
/// Every field is optional here so that a missing field produces the
/// generic validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub service: Option<String>,
    pub message: Option<String>,
}

impl BookingRequest {
    /// Check that every required field is present and non-blank, returning
    /// the trimmed booking input.
    pub fn validate(self) -> Result<NewBooking> {
        fn required(value: Option<String>) -> Result<String> {
            value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SalonError::validation(MISSING_FIELDS))
        }

        Ok(NewBooking {
            name: required(self.name)?,
            email: required(self.email)?,
            phone: required(self.phone)?,
            date: required(self.date)?,
            time: required(self.time)?,
            service: required(self.service)?,
            message: self
                .message
                .map(|m| m.trim().to_owned())
                .unwrap_or_default(),
        })
    }
}

impl From<NewBooking> for BookingRequest {
    fn from(new: NewBooking) -> Self {
        Self {
            name: Some(new.name),
            email: Some(new.email),
            phone: Some(new.phone),
            date: Some(new.date),
            time: Some(new.time),
            service: Some(new.service),
            message: Some(new.message),
        }
    }
}

/// Booking operations exposed to the API layer.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Validate a submission and store it. Nothing is written when
    /// validation fails.
    pub async fn book(&self, request: BookingRequest) -> Result<Booking> {
        let new = request.validate()?;
        let booking = self.store.create(new).await?;
        info!(
            id = booking.id,
            service = %booking.service,
            date = %booking.date,
            "booking created"
        );
        Ok(booking)
    }

    pub async fn list(&self) -> Result<Vec<Booking>> {
        Ok(self.store.list().await?)
    }

    /// Delete a booking, failing with [`SalonError::NotFound`] when the id
    /// is unknown.
    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(SalonError::not_found(BOOKING_NOT_FOUND));
        }
        info!(id, "booking deleted");
        Ok(())
    }

    /// Delete using an id taken verbatim from a URL. Ids that are not
    /// integers cannot exist and are reported as not found.
    pub async fn delete_raw(&self, raw_id: &str) -> Result<()> {
        let id = raw_id
            .trim()
            .parse::<i64>()
            .map_err(|_| SalonError::not_found(BOOKING_NOT_FOUND))?;
        self.delete(id).await
    }
}
