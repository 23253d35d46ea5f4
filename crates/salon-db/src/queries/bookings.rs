//! Database query functions for the `bookings` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::{Booking, NewBooking};

/// Insert a booking. Returns the stored row with the server-generated `id`
/// and `created_at`.
pub async fn insert_booking(pool: &PgPool, new: &NewBooking) -> Result<Booking> {
    let booking = sqlx::query_as::<_, Booking>(
        "INSERT INTO bookings (name, email, phone, date, time, service, message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.date)
    .bind(&new.time)
    .bind(&new.service)
    .bind(&new.message)
    .fetch_one(pool)
    .await
    .context("failed to insert booking")?;

    Ok(booking)
}

/// List all bookings, newest first. Rows created at the same instant keep
/// insertion order.
pub async fn list_bookings(pool: &PgPool) -> Result<Vec<Booking>> {
    let bookings =
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY created_at DESC, id ASC")
            .fetch_all(pool)
            .await
            .context("failed to list bookings")?;

    Ok(bookings)
}

/// Delete a booking. Returns `false` when no row had that id.
pub async fn delete_booking(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete booking")?;

    Ok(result.rows_affected() > 0)
}

/// Total number of stored bookings.
pub async fn count_bookings(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
        .fetch_one(pool)
        .await
        .context("failed to count bookings")?;

    Ok(count)
}
