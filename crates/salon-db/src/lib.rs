//! PostgreSQL persistence for salon bookings.
//!
//! Holds the connection config, pool helpers, embedded migrations, the
//! row models and the per-table query functions.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
