use thiserror::Error;

/// Unified error type surfaced by core DoubleAgent components.
#[derive(Error, Debug)]
pub enum DoubleAgentError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("snapshot not found: service={service} profile={profile}")]
    SnapshotNotFound { service: String, profile: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("internal: {0}")]
    Internal(String),
}

impl DoubleAgentError {
    /// Map to the HTTP status code a vendor router or control plane should emit.
    pub fn status_code(&self) -> u16 {
        match self {
            DoubleAgentError::NotFound(_) | DoubleAgentError::SnapshotNotFound { .. } => 404,
            DoubleAgentError::Conflict(_) => 409,
            DoubleAgentError::Validation(_) => 400,
            DoubleAgentError::Unauthorized(_) => 401,
            DoubleAgentError::Io(_) | DoubleAgentError::Serde(_) | DoubleAgentError::Internal(_) => 500,
        }
    }

    /// A compact JSON error body, `{"error": "...", "status": N}`.
    pub fn to_json_body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.to_string(),
            "status": self.status_code(),
        })
    }
}
