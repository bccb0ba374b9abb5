use rusqlite::ErrorCode;
use thiserror::Error;

use crate::models::EntityKind;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(rusqlite::Error),
}

impl BookingError {
    pub fn not_found(kind: EntityKind, id: i64) -> Self {
        BookingError::NotFound { kind, id }
    }

    /// HTTP-equivalent status the boundary reports for this error.
    pub fn status(&self) -> u16 {
        match self {
            BookingError::NotFound { .. } => 404,
            BookingError::Validation(_) => 422,
            BookingError::StoreUnavailable(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BookingError::NotFound { .. })
    }
}

impl From<rusqlite::Error> for BookingError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                let detail = message
                    .clone()
                    .unwrap_or_else(|| "constraint violation".to_string());
                BookingError::Validation(detail)
            }
            other => BookingError::StoreUnavailable(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_violations_become_validation_errors() {
        let failure = rusqlite::ffi::Error {
            code: ErrorCode::ConstraintViolation,
            extended_code: 787,
        };
        let err: BookingError =
            rusqlite::Error::SqliteFailure(failure, Some("FOREIGN KEY constraint failed".into()))
                .into();
        assert!(matches!(err, BookingError::Validation(ref msg) if msg.contains("FOREIGN KEY")));
        assert_eq!(err.status(), 422);
    }

    #[test]
    fn other_store_errors_are_unavailable() {
        let err: BookingError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, BookingError::StoreUnavailable(_)));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn not_found_reports_kind_and_id() {
        let err = BookingError::not_found(EntityKind::Artist, 7);
        assert_eq!(err.to_string(), "Artist 7 not found");
        assert!(err.is_not_found());
        assert_eq!(err.status(), 404);
    }
}
