use thiserror::Error;

/// Substrings (lowercase) that mark a server message as a usage-limit failure.
pub const USAGE_LIMIT_MARKERS: &[&str] = &["api usage limit", "quota", "limit"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TutorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JS interop error: {0}")]
    JsInterop(String),

    #[error("{0}")]
    Other(String),
}

/// How a failure should be surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials are gone; the user must log in again.
    Auth,
    /// The tutoring backend hit its usage quota.
    UsageLimit,
    /// Anything the user can simply retry.
    Recoverable,
}

impl TutorError {
    /// The human-readable message the server (or transport) reported.
    pub fn server_message(&self) -> String {
        match self {
            TutorError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_usage_limit(&self) -> bool {
        if matches!(self, TutorError::Unauthorized | TutorError::Auth(_)) {
            return false;
        }
        is_usage_limit_message(&self.server_message())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TutorError::Unauthorized | TutorError::Auth(_) => ErrorKind::Auth,
            e if e.is_usage_limit() => ErrorKind::UsageLimit,
            _ => ErrorKind::Recoverable,
        }
    }
}

/// Case-insensitive match against [`USAGE_LIMIT_MARKERS`].
pub fn is_usage_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    USAGE_LIMIT_MARKERS.iter().any(|m| lower.contains(m))
}

impl From<serde_json::Error> for TutorError {
    fn from(e: serde_json::Error) -> Self {
        TutorError::Serialization(e.to_string())
    }
}
