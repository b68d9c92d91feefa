use thiserror::Error;

/// Application-wide error types for Bazaar.
#[derive(Error, Debug)]
pub enum AppError {
    /// The requested record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule would be violated.
    #[error("{0}")]
    Conflict(String),

    /// Input failed validation or could not be read.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Missing, malformed or expired credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but lacking the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation is not offered for this resource.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// `NotFound` for a resource id, e.g. "product 7 not found".
    pub fn not_found(resource: &str, id: i64) -> Self {
        AppError::NotFound(format!("{resource} {id} not found"))
    }

    /// `ValidationError` scoped to a field.
    pub fn invalid(field: &str, reason: &str) -> Self {
        AppError::ValidationError(format!("{field}: {reason}"))
    }

    /// Returns true if the error is caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::Conflict(_)
                | AppError::ValidationError(_)
                | AppError::Unauthorized(_)
                | AppError::Forbidden(_)
                | AppError::Unsupported(_)
                | AppError::SerializationError(_)
        )
    }
}
