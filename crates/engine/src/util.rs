//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API.

use sea_orm::{DbErr, SqlErr};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// `true` when the store rejected a write because of a unique index.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err.to_string().contains("UNIQUE constraint failed")
}

pub(crate) fn is_unique_violation_error(err: &EngineError) -> bool {
    match err {
        EngineError::Database(db_err) => is_unique_violation(db_err),
        _ => false,
    }
}

pub(crate) fn normalize_required_id<'a>(value: &'a str, label: &str) -> ResultEngine<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidId(format!("{label} id must not be empty")));
    }
    Ok(trimmed)
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_is_detected_from_the_message() {
        let err = DbErr::Custom("UNIQUE constraint failed: cost_centers.code".to_string());
        assert!(is_unique_violation(&err));
        assert!(is_unique_violation_error(&EngineError::Database(err)));
        assert!(!is_unique_violation(&DbErr::Custom("disk I/O error".to_string())));
    }

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(Some(" a ")), Some("a".to_string()));
        assert!(normalize_required_id(" ", "purchase").is_err());
    }
}
