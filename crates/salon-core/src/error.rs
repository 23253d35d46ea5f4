//! Error taxonomy shared by every domain operation.

/// Errors surfaced by booking, portfolio and maintenance operations.
///
/// Each variant maps to one HTTP status at the API boundary: validation
/// failures are the caller's fault, not-found targets a missing record, and
/// storage wraps whatever the backing store reported.
#[derive(Debug, thiserror::Error)]
pub enum SalonError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl SalonError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

pub type Result<T, E = SalonError> = std::result::Result<T, E>;
