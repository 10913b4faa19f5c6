//! Error types for the router core
//!
//! None of these reach the caller of `QueryRouter::route`: extraction errors
//! are absorbed by the rule fallback, preference errors by an empty default.
//! Only `SessionError` propagates, and only for malformed session state.

/// Why the model-backed extractor could not produce a result
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Generation is disabled or has no endpoint configured.
    #[error("generation service not configured: {0}")]
    NotConfigured(String),

    /// The request could not be sent or the connection failed.
    #[error("generation request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("generation service error {status}: {body}")]
    Status { status: u16, body: String },

    /// The soft timeout elapsed before the service answered.
    #[error("generation timed out after {0} ms")]
    Timeout(u64),

    /// The service answered but carried no text.
    #[error("no text found in generation response")]
    EmptyResponse,

    /// The text contained no JSON object.
    #[error("no JSON object found in model output")]
    NoJson,

    /// A JSON span was found but did not parse.
    #[error("invalid JSON in model output: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON parsed but was not an object of the expected shape.
    #[error("unexpected model output shape: {0}")]
    Shape(String),
}

/// Session attributes holding continuation state were not readable
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed continuation state: {0}")]
    Malformed(String),

    #[error("failed to serialize continuation state: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Preference store failures
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("preference store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("preference store data is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("preference store unavailable: {0}")]
    Unavailable(String),
}
