use thiserror::Error;

/// Uniform failure type for everything that crosses the API boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Backend unreachable. Recovered by the connection monitor, never retried here.
    #[error("backend unavailable: {0}")]
    Connectivity(String),
    /// Backend rejected a create/update payload.
    #[error("{0}")]
    Validation(String),
    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: String },
    /// Backend answered with a document the client could not decode.
    #[error("unexpected {kind} payload: {message}")]
    Decode { kind: String, message: String },
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub const CONNECTIVITY_CODE: &'static str = "API/CONNECTIVITY";
    pub const VALIDATION_CODE: &'static str = "VALIDATION/REJECTED";
    pub const NOT_FOUND_CODE: &'static str = "API/NOT_FOUND";
    pub const DECODE_CODE: &'static str = "JSON/DECODE";

    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    pub fn decode(kind: impl Into<String>, err: &serde_json::Error) -> Self {
        ApiError::Decode {
            kind: kind.into(),
            message: err.to_string(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiError::Connectivity(_))
    }
}
