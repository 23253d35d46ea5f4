//! Durable booking store on the `bookings` table.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use salon_db::config::DbConfig;
use salon_db::models::{Booking, NewBooking};
use salon_db::pool;
use salon_db::queries::bookings;

use super::BookingStore;

/// [`BookingStore`] backed by PostgreSQL. Ids come from a `BIGSERIAL`
/// sequence, so deleted ids are never handed out again.
#[derive(Debug, Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and bring the `bookings` table
    /// up to date before handing out the store.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let pool = pool::connect_migrated(config).await?;
        info!(db = config.database_name().unwrap_or("?"), "bookings store connected");
        Ok(Self::new(pool))
    }

    /// Number of stored bookings.
    pub async fn count(&self) -> Result<i64> {
        bookings::count_bookings(&self.pool).await
    }

    /// Close the underlying pool, waiting for in-flight queries.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, new: NewBooking) -> Result<Booking> {
        bookings::insert_booking(&self.pool, &new).await
    }

    async fn list(&self) -> Result<Vec<Booking>> {
        bookings::list_bookings(&self.pool).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        bookings::delete_booking(&self.pool, id).await
    }
}
