//! # API Error Type
//!
//! Unified error type for back-office commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Back-Office                        │
//! │                                                                         │
//! │  ValidationError ─► CoreError ─► DbError ─────────┐                    │
//! │                         │                         │                    │
//! │                         └──────► PostingError ────┤                    │
//! │                                                   ▼                    │
//! │                                      ApiError { code, message }        │
//! │                                                   │                    │
//! │  UI:  VALIDATION_ERROR  → highlight the field, fix input               │
//! │       STATE_CONFLICT    → reload, the document changed or is final     │
//! │       NOT_FOUND         → the document or match is gone                │
//! │       POSTING_REJECTED  → show the posting rule's message              │
//! │       DATABASE_ERROR    → show the store's message verbatim            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::error;

use crate::config::ConfigError;
use crate::state::DraftError;
use lanna_core::{CoreError, ValidationError};
use lanna_db::{DbError, PostingError};

/// Error returned from every command.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "lines[2].quantity must be positive",
///   "field": "lines[2].quantity"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error class
    pub code: ErrorCode,

    /// Human-readable message, suitable for direct display
    pub message: String,

    /// Offending input field, for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Error classes the UI distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input is malformed; nothing was written.
    ValidationError,

    /// The document is not in the state the operation needs.
    StateConflict,

    NotFound,

    /// A posting rule refused the document.
    PostingRejected,

    /// Store or integrity failure.
    DatabaseError,

    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// True when the caller should reload rather than retry.
    pub fn is_state_conflict(&self) -> bool {
        self.code == ErrorCode::StateConflict
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError {
            code: ErrorCode::ValidationError,
            field: Some(err.field().to_string()),
            message: err.to_string(),
        }
    }
}

/// Converts core rule failures to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            CoreError::OverAllocated { .. } => ApiError::validation(err.to_string()),
            CoreError::NotEditable { .. }
            | CoreError::InvalidTransition { .. }
            | CoreError::DocumentHasMatches { .. } => {
                ApiError::new(ErrorCode::StateConflict, err.to_string())
            }
            CoreError::PostingRule(message) => ApiError::new(ErrorCode::PostingRejected, message),
        }
    }
}

/// Converts database errors to API errors.
///
/// Store failures keep their message verbatim; they are also logged.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::Domain(e) => e.into(),
            DbError::UniqueViolation { .. } => ApiError::validation(err.to_string()),
            DbError::ForeignKeyViolation { .. }
            | DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::TransactionFailed(_)
            | DbError::PoolExhausted => {
                error!(error = %err, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, err.to_string())
            }
            DbError::Internal(_) => {
                error!(error = %err, "Internal database error");
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl From<PostingError> for ApiError {
    fn from(err: PostingError) -> Self {
        match err {
            PostingError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            PostingError::NotEditable { .. } | PostingError::AlreadyFinalized { .. } => {
                ApiError::new(ErrorCode::StateConflict, err.to_string())
            }
            PostingError::Rejected(message) => ApiError::new(ErrorCode::PostingRejected, message),
            PostingError::Db(e) => e.into(),
        }
    }
}

impl From<DraftError> for ApiError {
    fn from(err: DraftError) -> Self {
        let field = err.field().map(str::to_string);
        ApiError {
            code: ErrorCode::ValidationError,
            message: err.to_string(),
            field,
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        error!(error = %err, "Configuration error");
        ApiError::internal(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for commands.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use lanna_core::{DocumentKind, DocumentStatus, Quantity};

    #[test]
    fn test_validation_carries_field() {
        let err: ApiError = DbError::from(ValidationError::MustBePositive {
            field: "lines[2].quantity".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("lines[2].quantity"));
    }

    #[test]
    fn test_state_conflicts() {
        let not_editable: ApiError = PostingError::NotEditable {
            kind: DocumentKind::DeliveryNote,
            id: "dn-1".to_string(),
            status: DocumentStatus::Posted,
        }
        .into();
        assert!(not_editable.is_state_conflict());
        assert!(not_editable.message.contains("POSTED"));

        let raced: ApiError = PostingError::AlreadyFinalized {
            kind: DocumentKind::TaxInvoice,
            id: "ti-1".to_string(),
            status: DocumentStatus::Void,
        }
        .into();
        assert!(raced.is_state_conflict());

        let matched: ApiError = DbError::Domain(CoreError::DocumentHasMatches {
            kind: DocumentKind::DeliveryNote,
            id: "dn-1".to_string(),
        })
        .into();
        assert!(matched.is_state_conflict());
    }

    #[test]
    fn test_over_allocation_is_validation() {
        let err: ApiError = CoreError::OverAllocated {
            line: "DN line 1".to_string(),
            quantity: Quantity::from_units(10),
            matched: Quantity::from_units(8),
            requested: Quantity::from_units(3),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_posting_rejection_passes_message_through() {
        let err: ApiError = PostingError::Rejected("Line 2: SKU X is inactive".to_string()).into();
        assert_eq!(err.code, ErrorCode::PostingRejected);
        assert_eq!(err.message, "Line 2: SKU X is inactive");
    }

    #[test]
    fn test_store_message_is_verbatim() {
        let err: ApiError = DbError::QueryFailed("disk I/O error".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("disk I/O error"));
    }

    #[test]
    fn test_serialized_code() {
        let json = serde_json::to_string(&ApiError::not_found("Match", "m-1")).unwrap();
        assert!(json.contains("\"code\":\"NOT_FOUND\""));
        assert!(!json.contains("field"));
    }
}
