use serde::{Deserialize, Serialize};

/// Default title the server and client give to a fresh session.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl ProficiencyLevel {
    pub fn all() -> &'static [ProficiencyLevel] {
        &[
            ProficiencyLevel::Beginner,
            ProficiencyLevel::Intermediate,
            ProficiencyLevel::Advanced,
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            ProficiencyLevel::Beginner => "Beginner",
            ProficiencyLevel::Intermediate => "Intermediate",
            ProficiencyLevel::Advanced => "Advanced",
        }
    }

    /// Wire value, also used as a query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProficiencyLevel::Beginner => "beginner",
            ProficiencyLevel::Intermediate => "intermediate",
            ProficiencyLevel::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningFocus {
    #[default]
    General,
    Grammar,
    Vocabulary,
    Conversation,
    Reading,
    Writing,
    Pronunciation,
    Exam,
}

impl LearningFocus {
    pub fn all() -> &'static [LearningFocus] {
        &[
            LearningFocus::General,
            LearningFocus::Grammar,
            LearningFocus::Vocabulary,
            LearningFocus::Conversation,
            LearningFocus::Reading,
            LearningFocus::Writing,
            LearningFocus::Pronunciation,
            LearningFocus::Exam,
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            LearningFocus::General => "General English",
            LearningFocus::Grammar => "Grammar",
            LearningFocus::Vocabulary => "Vocabulary",
            LearningFocus::Conversation => "Conversation",
            LearningFocus::Reading => "Reading",
            LearningFocus::Writing => "Writing",
            LearningFocus::Pronunciation => "Pronunciation",
            LearningFocus::Exam => "Exam Preparation",
        }
    }
}

/// A persisted conversation thread, as returned by the chat API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub proficiency_level: ProficiencyLevel,
    #[serde(default)]
    pub learning_focus: LearningFocus,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of `POST /chat/sessions/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionCreate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proficiency_level: Option<ProficiencyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_focus: Option<LearningFocus>,
}

/// Body of `PATCH /chat/sessions/{id}/`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proficiency_level: Option<ProficiencyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_focus: Option<LearningFocus>,
}

impl SessionUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn settings(level: ProficiencyLevel, focus: LearningFocus) -> Self {
        Self {
            title: None,
            proficiency_level: Some(level),
            learning_focus: Some(focus),
        }
    }
}

/// Per-user chat statistics from `GET /chat/sessions/stats/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: u64,
    pub total_messages: u64,
    #[serde(default)]
    pub average_messages_per_session: f64,
    #[serde(default)]
    pub sessions_by_level: std::collections::BTreeMap<String, u64>,
    #[serde(default)]
    pub sessions_by_focus: std::collections::BTreeMap<String, u64>,
    #[serde(default)]
    pub recent_sessions: Vec<RecentSession>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSession {
    pub id: u64,
    pub title: String,
    pub proficiency_level: String,
    pub learning_focus: String,
    pub message_count: u64,
    pub updated_at: String,
    pub created_at: String,
}
