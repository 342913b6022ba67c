use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::session::{LearningFocus, ProficiencyLevel};

/// Apology appended to the conversation when the tutor is over quota.
pub const USAGE_LIMIT_APOLOGY: &str = "I'm sorry, we've reached our API usage limit. \
Please try again later or contact support if this persists.";

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A stored message, as returned by `GET /chat/sessions/{id}/messages/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

/// Body of `POST /chat/sessions/chat/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    /// Omitted when no session is active; the server then creates one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proficiency_level: Option<ProficiencyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_focus: Option<LearningFocus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub response: String,
    pub session_id: u64,
    /// Id of the stored assistant reply
    pub message_id: u64,
    pub proficiency_level: ProficiencyLevel,
    pub learning_focus: LearningFocus,
}

/// Where a timeline entry stands relative to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Shown optimistically, request still in flight.
    Pending { local_id: Uuid },
    /// Stored by the server. The id is known for replies and reloaded history;
    /// a user turn acknowledged by a chat reply has none.
    Confirmed { server_id: Option<u64> },
    /// The request carrying this entry failed.
    Failed { local_id: Uuid, reason: String },
    /// Authored by the client itself and never sent.
    Synthetic,
}

/// One line of the conversation as the UI shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub delivery: Delivery,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl TimelineEntry {
    pub fn pending_user(
        local_id: Uuid,
        content: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            delivery: Delivery::Pending { local_id },
            role: Role::User,
            content: content.into(),
            created_at: created_at.into(),
        }
    }

    pub fn confirmed(msg: ChatMessage) -> Self {
        Self {
            delivery: Delivery::Confirmed {
                server_id: Some(msg.id),
            },
            role: msg.role,
            content: msg.content,
            created_at: msg.created_at,
        }
    }

    pub fn synthetic(content: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            delivery: Delivery::Synthetic,
            role: Role::Assistant,
            content: content.into(),
            created_at: created_at.into(),
        }
    }

    pub fn local_id(&self) -> Option<Uuid> {
        match &self.delivery {
            Delivery::Pending { local_id } | Delivery::Failed { local_id, .. } => Some(*local_id),
            _ => None,
        }
    }

    pub fn server_id(&self) -> Option<u64> {
        match self.delivery {
            Delivery::Confirmed { server_id } => server_id,
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.delivery, Delivery::Pending { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.delivery, Delivery::Failed { .. })
    }

    /// Pending → Confirmed. Any other state is left as is.
    pub fn confirm(&mut self, server_id: Option<u64>) {
        if self.is_pending() {
            self.delivery = Delivery::Confirmed { server_id };
        }
    }

    /// Pending → Failed. Any other state is left as is.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if let Delivery::Pending { local_id } = self.delivery {
            self.delivery = Delivery::Failed {
                local_id,
                reason: reason.into(),
            };
        }
    }
}
