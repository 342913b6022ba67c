//! Fire-and-forget cache warming for data the next screen is likely to need.
//!
//! Prefetching is an optimisation only: every request runs concurrently, one
//! failure never stops the others, and failures are logged but not reported.

use std::rc::Rc;

use chrono::Duration;
use futures::future::join_all;
use serde_json::Value;
use tutor_types::session::ProficiencyLevel;

use crate::client::{ApiClient, CacheOptions};
use crate::content::{
    random_words_query, CATEGORIES_PATH, GRAMMAR_STATS_PATH, PRACTICE_WORD_COUNT,
    VIDEOS_STATS_PATH, VOCABULARY_CATEGORIES_PATH, VOCABULARY_RANDOM_PATH,
    VOCABULARY_STATS_PATH,
};

/// Lifetime of prefetched responses.
pub const PREFETCH_TTL_SECS: i64 = 5 * 60;

/// A GET to warm: path plus query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

#[derive(Clone)]
pub struct Prefetcher {
    client: Rc<ApiClient>,
}

impl Prefetcher {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self { client }
    }

    /// Fetch every endpoint into the cache with `ttl`. Returns how many
    /// succeeded.
    pub async fn prefetch_endpoints(&self, endpoints: &[Endpoint], ttl: Duration) -> usize {
        let fetches = endpoints.iter().map(|ep| async move {
            let result: tutor_types::Result<Value> = self
                .client
                .get_json(&ep.path, &ep.query, CacheOptions::ttl(ttl))
                .await;
            match result {
                Ok(_) => true,
                Err(e) => {
                    log::debug!("prefetch {} failed: {}", ep.path, e);
                    false
                }
            }
        });
        let ok = join_all(fetches).await.into_iter().filter(|ok| *ok).count();
        log::debug!("prefetched {}/{} endpoints", ok, endpoints.len());
        ok
    }

    /// Categories and the three stats endpoints shown on the dashboard.
    pub async fn prefetch_dashboard(&self) -> usize {
        let endpoints = [
            Endpoint::new(CATEGORIES_PATH),
            Endpoint::new(GRAMMAR_STATS_PATH),
            Endpoint::new(VIDEOS_STATS_PATH),
            Endpoint::new(VOCABULARY_STATS_PATH),
        ];
        self.prefetch_endpoints(&endpoints, Duration::seconds(PREFETCH_TTL_SECS))
            .await
    }

    pub async fn prefetch_vocabulary_practice(&self, level: Option<ProficiencyLevel>) -> usize {
        let endpoints = [
            Endpoint::new(VOCABULARY_CATEGORIES_PATH),
            Endpoint::new(VOCABULARY_RANDOM_PATH)
                .with_query(random_words_query(Some(PRACTICE_WORD_COUNT), level)),
        ];
        self.prefetch_endpoints(&endpoints, Duration::seconds(PREFETCH_TTL_SECS))
            .await
    }
}
