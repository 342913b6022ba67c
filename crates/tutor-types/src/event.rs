use serde::{Deserialize, Serialize};

/// Default lifetime of a notification, in seconds.
pub const NOTICE_SECS: f64 = 3.0;
/// Lifetime of the usage-limit notification, in seconds.
pub const USAGE_LIMIT_NOTICE_SECS: f64 = 6.0;

/// Events emitted by the core for the UI to react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TutorEvent {
    /// A non-blocking toast
    Notice(Notice),

    /// Credentials are gone; the UI must show the login screen
    SessionExpired,

    /// A failed send handed the user's draft back
    DraftRestored { text: String },

    /// A user logged in or was restored from storage
    SignedIn { username: String },

    /// The user logged out on purpose
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub duration_secs: f64,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
            duration_secs: NOTICE_SECS,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
            duration_secs: NOTICE_SECS,
        }
    }

    pub fn usage_limit() -> Self {
        Self {
            level: NoticeLevel::Error,
            text: "We've reached our API usage limit. Please try again later.".to_string(),
            duration_secs: USAGE_LIMIT_NOTICE_SECS,
        }
    }
}
