//! Learning content served by the `/center/` endpoints.
//!
//! Fields the server may leave out or null are `#[serde(default)]` so that
//! list screens keep working against partially populated records.

use serde::{Deserialize, Serialize};
use crate::session::ProficiencyLevel;

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiListResponse<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Some endpoints answer with a page, others with a bare array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Page(ApiListResponse<T>),
    Plain(Vec<T>),
}

impl<T> ListPayload<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListPayload::Page(page) => page.results,
            ListPayload::Plain(items) => items,
        }
    }

    /// Total number of records on the server, if the payload says.
    pub fn total(&self) -> usize {
        match self {
            ListPayload::Page(page) => page.count as usize,
            ListPayload::Plain(items) => items.len(),
        }
    }
}

/// Query parameters shared by the list endpoints. `None` fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub level: Option<ProficiencyLevel>,
    pub category: Option<String>,
    pub status: Option<PublishStatus>,
    pub ordering: Option<String>,
}

impl ListParams {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    /// Flatten into `(key, value)` pairs for the query string.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("page_size".to_string(), size.to_string()));
        }
        if let Some(ref search) = self.search {
            pairs.push(("search".to_string(), search.clone()));
        }
        if let Some(level) = self.level {
            pairs.push(("level".to_string(), level.as_str().to_string()));
        }
        if let Some(ref category) = self.category {
            pairs.push(("category".to_string(), category.clone()));
        }
        if let Some(status) = self.status {
            pairs.push(("status".to_string(), status.as_str().to_string()));
        }
        if let Some(ref ordering) = self.ordering {
            pairs.push(("ordering".to_string(), ordering.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Published => "published",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Body of category create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarLesson {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub examples: Option<String>,
    #[serde(default)]
    pub exercises: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub order: u32,
    /// Minutes
    #[serde(default)]
    pub estimated_duration: u32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoLesson {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub level: ProficiencyLevel,
    /// Seconds
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub views_count: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyWord {
    pub id: u64,
    pub turkmen_word: String,
    pub english_word: String,
    #[serde(default)]
    pub pronunciation: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub example_sentence: Option<String>,
    pub level: ProficiencyLevel,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Per-level breakdown used by the stats endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelBreakdown {
    #[serde(default)]
    pub beginner: u64,
    #[serde(default)]
    pub intermediate: u64,
    #[serde(default)]
    pub advanced: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total: u64,
    #[serde(default)]
    pub by_category: Option<LevelBreakdown>,
    #[serde(default)]
    pub by_level: Option<LevelBreakdown>,
}

/// Stats for the three content types, as shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub grammar: StatsResponse,
    pub videos: StatsResponse,
    pub vocabulary: StatsResponse,
}

impl DashboardStats {
    pub fn total(&self) -> u64 {
        self.grammar.total + self.videos.total + self.vocabulary.total
    }
}

/// Filters for `GET /center/vocabulary/search_advanced/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularySearch {
    pub query: Option<String>,
    pub part_of_speech: Option<String>,
    pub starts_with: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl VocabularySearch {
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.extra.clone();
        if let Some(ref q) = self.query {
            pairs.push(("q".to_string(), q.clone()));
        }
        if let Some(ref pos) = self.part_of_speech {
            pairs.push(("part_of_speech".to_string(), pos.clone()));
        }
        if let Some(ref prefix) = self.starts_with {
            pairs.push(("starts_with".to_string(), prefix.clone()));
        }
        pairs
    }
}
