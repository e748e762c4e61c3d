use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced to callers of the cart and session APIs
#[derive(Debug, Error)]
pub enum CartError {
    #[error("No active session: the cart can only be used inside a session scope")]
    NoActiveSession,

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: Uuid },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Snapshot store error: {source}")]
    Snapshot {
        #[from]
        source: SnapshotError,
    },
}

/// Snapshot store errors for persistence operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid snapshot key: {key}")]
    InvalidKey { key: String },

    #[error("AWS SDK error: {message}")]
    AwsSdk { message: String },

    #[error("Invalid snapshot record: {message}")]
    InvalidRecord { message: String },
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Value out of range: {field}, min={min}, max={max}, value={value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },
}

impl From<ValidationError> for CartError {
    fn from(err: ValidationError) -> Self {
        CartError::ValidationError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for cart and session operations
pub type CartResult<T> = Result<T, CartError>;

/// Result type alias for snapshot store operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
