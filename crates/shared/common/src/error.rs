//! Unified error handling for the data-access layer.
//!
//! Store failures are carried through unchanged; the remaining variants
//! describe lookups that did not produce exactly the expected result or
//! misuse of a unit of work.

use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Lookup errors
    #[error("Resource not found")]
    NotFound,

    #[error("More than one element matches the predicate")]
    AmbiguousMatch,

    // Lifecycle
    #[error("Unit of work has already been disposed")]
    Disposed,

    // Validation
    #[error("{0}")]
    Validation(String),

    // Store errors are passed through untouched
    #[cfg(feature = "database")]
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

impl AppError {
    /// Get a stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::AmbiguousMatch => "AMBIGUOUS_MATCH",
            AppError::Disposed => "DISPOSED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Whether the error originates from the underlying store
    pub fn is_store_failure(&self) -> bool {
        #[cfg(feature = "database")]
        if matches!(self, AppError::Database(_)) {
            return true;
        }
        false
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_or_not_found() {
        let missing: Option<u32> = None;
        assert!(matches!(missing.ok_or_not_found(), Err(AppError::NotFound)));
        assert_eq!(Some(7).ok_or_not_found().unwrap(), 7);
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            AppError::NotFound,
            AppError::AmbiguousMatch,
            AppError::Disposed,
            AppError::validation("bad"),
        ];
        let mut codes: Vec<_> = errors.iter().map(AppError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[cfg(feature = "database")]
    #[test]
    fn test_database_error_is_transparent() {
        let err = AppError::from(sea_orm::DbErr::Custom("connection reset".to_string()));
        assert!(err.is_store_failure());
        assert_eq!(
            err.to_string(),
            sea_orm::DbErr::Custom("connection reset".to_string()).to_string()
        );
    }
}
