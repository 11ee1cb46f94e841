//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`KeyNotFound`] thrown when a source record, a lot or a stored row is missing.
//! - [`PartialWrite`] thrown when the converter's unit of work failed and was
//!   rolled back.
//! - [`InvalidSource`] thrown when a source record cannot be turned into money.
//! - [`AllocationMismatch`] thrown when allocations do not sum to their entry.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`PartialWrite`]: EngineError::PartialWrite
//!  [`InvalidSource`]: EngineError::InvalidSource
//!  [`AllocationMismatch`]: EngineError::AllocationMismatch
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Partial write rolled back: {0}")]
    PartialWrite(String),
    #[error("Invalid source record: {0}")]
    InvalidSource(String),
    #[error("Allocation mismatch: {0}")]
    AllocationMismatch(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::PartialWrite(a), Self::PartialWrite(b)) => a == b,
            (Self::InvalidSource(a), Self::InvalidSource(b)) => a == b,
            (Self::AllocationMismatch(a), Self::AllocationMismatch(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidValue(a), Self::InvalidValue(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
