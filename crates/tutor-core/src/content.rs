//! Typed endpoints for the learning content under `/center/`.
//!
//! Every read goes through the response cache with the default TTL; every
//! write invalidates the touched record and its collection.

use std::rc::Rc;

use tutor_types::{
    Result,
    content::{
        Category, CategoryInput, GrammarLesson, ListParams, ListPayload, StatsResponse,
        VideoLesson, VocabularySearch, VocabularyWord,
    },
    session::ProficiencyLevel,
};

use crate::client::{ApiClient, CacheOptions};

pub const CATEGORIES_PATH: &str = "/center/categories/";
pub const GRAMMAR_PATH: &str = "/center/grammar/";
pub const GRAMMAR_STATS_PATH: &str = "/center/grammar/stats/";
pub const VIDEOS_PATH: &str = "/center/videos/";
pub const VIDEOS_STATS_PATH: &str = "/center/videos/stats/";
pub const VOCABULARY_PATH: &str = "/center/vocabulary/";
pub const VOCABULARY_STATS_PATH: &str = "/center/vocabulary/stats/";
pub const VOCABULARY_RANDOM_PATH: &str = "/center/vocabulary/random/";
pub const VOCABULARY_SEARCH_PATH: &str = "/center/vocabulary/search_advanced/";
pub const VOCABULARY_CATEGORIES_PATH: &str = "/center/vocabulary/categories/";

/// Number of words a practice round asks for.
pub const PRACTICE_WORD_COUNT: u32 = 20;

fn detail(collection: &str, id: u64) -> String {
    format!("{}{}/", collection, id)
}

/// Query pairs for `/center/vocabulary/random/`.
pub fn random_words_query(count: Option<u32>, level: Option<ProficiencyLevel>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Some(count) = count {
        pairs.push(("count".to_string(), count.to_string()));
    }
    if let Some(level) = level {
        pairs.push(("level".to_string(), level.as_str().to_string()));
    }
    pairs
}

#[derive(Clone)]
pub struct ContentApi {
    client: Rc<ApiClient>,
}

impl ContentApi {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self { client }
    }

    // ─── Categories ──────────────────────────────────────────

    pub async fn categories(&self, params: &ListParams) -> Result<ListPayload<Category>> {
        self.client
            .get_json(CATEGORIES_PATH, &params.to_pairs(), CacheOptions::default())
            .await
    }

    pub async fn category(&self, id: u64) -> Result<Category> {
        self.client
            .get_json(&detail(CATEGORIES_PATH, id), &[], CacheOptions::default())
            .await
    }

    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category> {
        self.client.post_json(CATEGORIES_PATH, input).await
    }

    pub async fn update_category(&self, id: u64, input: &CategoryInput) -> Result<Category> {
        self.client
            .put_json(&detail(CATEGORIES_PATH, id), input)
            .await
    }

    pub async fn delete_category(&self, id: u64) -> Result<()> {
        self.client.delete(&detail(CATEGORIES_PATH, id)).await
    }

    // ─── Grammar ─────────────────────────────────────────────

    pub async fn grammar_lessons(&self, params: &ListParams) -> Result<ListPayload<GrammarLesson>> {
        self.client
            .get_json(GRAMMAR_PATH, &params.to_pairs(), CacheOptions::default())
            .await
    }

    pub async fn grammar_lesson(&self, id: u64) -> Result<GrammarLesson> {
        self.client
            .get_json(&detail(GRAMMAR_PATH, id), &[], CacheOptions::default())
            .await
    }

    pub async fn grammar_stats(&self) -> Result<StatsResponse> {
        self.client
            .get_json(GRAMMAR_STATS_PATH, &[], CacheOptions::default())
            .await
    }

    // ─── Videos ──────────────────────────────────────────────

    pub async fn videos(&self, params: &ListParams) -> Result<ListPayload<VideoLesson>> {
        self.client
            .get_json(VIDEOS_PATH, &params.to_pairs(), CacheOptions::default())
            .await
    }

    pub async fn video(&self, id: u64) -> Result<VideoLesson> {
        self.client
            .get_json(&detail(VIDEOS_PATH, id), &[], CacheOptions::default())
            .await
    }

    pub async fn video_stats(&self) -> Result<StatsResponse> {
        self.client
            .get_json(VIDEOS_STATS_PATH, &[], CacheOptions::default())
            .await
    }

    // ─── Vocabulary ──────────────────────────────────────────

    pub async fn vocabulary(&self, params: &ListParams) -> Result<ListPayload<VocabularyWord>> {
        self.client
            .get_json(VOCABULARY_PATH, &params.to_pairs(), CacheOptions::default())
            .await
    }

    pub async fn vocabulary_word(&self, id: u64) -> Result<VocabularyWord> {
        self.client
            .get_json(&detail(VOCABULARY_PATH, id), &[], CacheOptions::default())
            .await
    }

    pub async fn vocabulary_stats(&self) -> Result<StatsResponse> {
        self.client
            .get_json(VOCABULARY_STATS_PATH, &[], CacheOptions::default())
            .await
    }

    /// A practice set. Cached like any other read so a prefetched round is
    /// served instantly.
    pub async fn random_words(
        &self,
        count: Option<u32>,
        level: Option<ProficiencyLevel>,
    ) -> Result<Vec<VocabularyWord>> {
        let payload: ListPayload<VocabularyWord> = self
            .client
            .get_json(
                VOCABULARY_RANDOM_PATH,
                &random_words_query(count, level),
                CacheOptions::default(),
            )
            .await?;
        Ok(payload.into_vec())
    }

    pub async fn search_vocabulary(
        &self,
        search: &VocabularySearch,
    ) -> Result<ListPayload<VocabularyWord>> {
        self.client
            .get_json(VOCABULARY_SEARCH_PATH, &search.to_pairs(), CacheOptions::default())
            .await
    }

    pub async fn vocabulary_categories(&self) -> Result<Vec<String>> {
        self.client
            .get_json(VOCABULARY_CATEGORIES_PATH, &[], CacheOptions::default())
            .await
    }
}
