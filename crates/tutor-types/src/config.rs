use serde::{Deserialize, Serialize};
use crate::session::{LearningFocus, ProficiencyLevel};

/// Storage key the app persists [`TutorConfig`] under.
pub const CONFIG_STORAGE_KEY: &str = "tutor:config";

/// Fixed storage keys for the persisted auth triple.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub learning: LearningDefaults,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            request_timeout_ms: 30_000,
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            learning: LearningDefaults::default(),
        }
    }
}

impl TutorConfig {
    /// Base URL without a trailing slash, so paths can be appended verbatim.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub default_ttl_secs: u64,
    /// Upper bound on live entries. `None` keeps the cache unbounded and
    /// relies on TTL expiry alone.
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 5 * 60,
            max_entries: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackendType,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackendType {
    /// Auto-detect best available backend
    Auto,
    Memory,
    LocalStorage,
}

/// Proficiency and focus used before any session has been selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LearningDefaults {
    pub proficiency: ProficiencyLevel,
    pub focus: LearningFocus,
}
