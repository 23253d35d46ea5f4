//! Domain layer for the salon booking site.
//!
//! - [`booking`]: the booking store trait, its memory and PostgreSQL
//!   implementations, and request validation.
//! - [`portfolio`]: pluggable blob storage and the upload policy.
//! - [`maintenance`]: the process-wide maintenance switch.
//! - [`wizard`]: the multi-step booking form state machine.

pub mod booking;
pub mod error;
pub mod maintenance;
pub mod portfolio;
pub mod wizard;

pub use error::SalonError;
