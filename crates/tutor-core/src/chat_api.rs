//! `ChatPort` over the authenticated API client.
//!
//! Chat reads bypass the cache lookup: the conversation changes under the
//! user's feet and a stale history would hide their last turn. The fresh
//! responses are still stored so the prefetcher and other screens can share
//! them.

use async_trait::async_trait;
use tutor_types::{
    Result,
    content::ListPayload,
    message::{ChatMessage, SendMessageRequest, SendMessageResponse},
    session::{ChatSession, SessionCreate, SessionStats, SessionUpdate},
};

use crate::client::{ApiClient, CacheOptions};
use crate::ports::ChatPort;

pub const SESSIONS_PATH: &str = "/chat/sessions/";
pub const CHAT_PATH: &str = "/chat/sessions/chat/";
pub const STATS_PATH: &str = "/chat/sessions/stats/";

pub fn session_path(id: u64) -> String {
    format!("/chat/sessions/{}/", id)
}

pub fn messages_path(id: u64) -> String {
    format!("/chat/sessions/{}/messages/", id)
}

#[async_trait(?Send)]
impl ChatPort for ApiClient {
    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let payload: ListPayload<ChatSession> = self
            .get_json(SESSIONS_PATH, &[], CacheOptions::bypass())
            .await?;
        Ok(payload.into_vec())
    }

    async fn create_session(&self, data: SessionCreate) -> Result<ChatSession> {
        self.post_json(SESSIONS_PATH, &data).await
    }

    async fn update_session(&self, id: u64, data: SessionUpdate) -> Result<ChatSession> {
        self.patch_json(&session_path(id), &data).await
    }

    async fn delete_session(&self, id: u64) -> Result<()> {
        self.delete(&session_path(id)).await
    }

    async fn list_messages(&self, session_id: u64) -> Result<Vec<ChatMessage>> {
        let payload: ListPayload<ChatMessage> = self
            .get_json(&messages_path(session_id), &[], CacheOptions::bypass())
            .await?;
        Ok(payload.into_vec())
    }

    async fn send_message(&self, req: SendMessageRequest) -> Result<SendMessageResponse> {
        self.post_json(CHAT_PATH, &req).await
    }

    async fn session_stats(&self) -> Result<SessionStats> {
        self.get_json(STATS_PATH, &[], CacheOptions::bypass()).await
    }
}
