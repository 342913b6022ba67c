//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `tutor-core` (pure Rust).
//! Implementations live in `tutor-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tutor_types::{
    Result,
    message::{ChatMessage, SendMessageRequest, SendMessageResponse},
    session::{ChatSession, SessionCreate, SessionStats, SessionUpdate},
};

// ─── HTTP Port ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A request relative to the API base URL
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path plus optional `?query`, e.g. `/chat/sessions/`
    pub path: String,
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_json_body(mut self, body: String) -> Self {
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("authorization"));
        self.headers
            .push(("Authorization".to_string(), format!("Bearer {}", token)));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait(?Send)]
pub trait HttpPort {
    /// Send a request. Non-2xx statuses come back as `Ok`; only transport
    /// failures (offline, CORS, timeout) are errors.
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse>;
}

// ─── Storage Port ────────────────────────────────────────────

#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys with a given prefix
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Clock Port ──────────────────────────────────────────────

pub trait ClockPort {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock. Under `wasm32` chrono reads `Date.now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ─── Chat Port ───────────────────────────────────────────────

/// The tutoring chat API as the session manager sees it.
#[async_trait(?Send)]
pub trait ChatPort {
    async fn list_sessions(&self) -> Result<Vec<ChatSession>>;
    async fn create_session(&self, data: SessionCreate) -> Result<ChatSession>;
    async fn update_session(&self, id: u64, data: SessionUpdate) -> Result<ChatSession>;
    async fn delete_session(&self, id: u64) -> Result<()>;
    async fn list_messages(&self, session_id: u64) -> Result<Vec<ChatMessage>>;
    async fn send_message(&self, req: SendMessageRequest) -> Result<SendMessageResponse>;
    async fn session_stats(&self) -> Result<SessionStats>;
}
