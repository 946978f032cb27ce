//! crates/study_shield_core/src/error.rs
//!
//! The error taxonomy surfaced by every core operation.

use uuid::Uuid;

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Entity absent.
    #[error("{0}")]
    NotFound(String),

    /// Caller is authenticated but does not own the target.
    #[error("{0}")]
    Forbidden(String),

    /// Operation incompatible with the target's lifecycle state.
    #[error("{0}")]
    InvalidState(String),

    /// Malformed input, such as an unparseable identifier.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Not enough coins: balance {balance}, price {price}")]
    InsufficientFunds { balance: i64, price: i64 },

    #[error("Could not validate credentials")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<PortError> for CoreError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(what) => CoreError::NotFound(what),
            PortError::Unauthorized => CoreError::Unauthorized,
            PortError::Unexpected(msg) => CoreError::Internal(msg),
            PortError::Conflict(msg) => CoreError::InvalidState(msg),
        }
    }
}

/// Parses a path identifier, naming `kind` in the error.
pub fn parse_id(raw: &str, kind: &str) -> CoreResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| CoreError::InvalidInput(format!("Invalid {kind} ID")))
}
