pub mod booking;
pub mod clock;
pub mod item;
pub mod repository;
pub mod request;
pub mod user;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use booking::{Booking, BookingDetails, BookingRole, BookingService, BookingState, BookingStatus};
pub use clock::{Clock, FixedClock, SystemClock};
pub use item::{Comment, Item, ItemService, ItemView};
pub use repository::Repositories;
pub use request::{ItemRequest, RequestScope, RequestService, RequestView};
pub use user::{User, UserService};

use repository::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not available: {0}")]
    NotAvailable(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Stores may box a `CoreError` (e.g. a unique violation surfaced as
/// `AlreadyExists`); it is recovered here. Anything else is internal.
impl From<RepoError> for CoreError {
    fn from(err: RepoError) -> Self {
        match err.downcast::<CoreError>() {
            Ok(core) => *core,
            Err(other) => CoreError::InternalError(other.to_string()),
        }
    }
}

pub(crate) fn require_non_blank(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::ValidationError(format!("{} must not be blank", field)));
    }
    Ok(())
}

/// Treats `None` and whitespace-only strings alike: no change requested.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_core_error_survives_repository_boundary() {
        let boxed: RepoError = Box::new(CoreError::AlreadyExists("email taken".into()));
        assert!(matches!(CoreError::from(boxed), CoreError::AlreadyExists(msg) if msg == "email taken"));
    }

    #[test]
    fn test_foreign_error_becomes_internal() {
        let boxed: RepoError = "connection reset".into();
        assert!(matches!(CoreError::from(boxed), CoreError::InternalError(_)));
    }

    #[test]
    fn test_non_blank_filters_whitespace() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some("Drill".into())), Some("Drill".into()));
        assert!(require_non_blank("name", " ").is_err());
    }
}
