//! WASM-target tests for tutor-platform (Node.js runtime).
//!
//! Tests MemoryStorage, backend selection, and URL building under
//! wasm32-unknown-unknown via `wasm-pack test --node`.
//!
//! localStorage and fetch need a browser and are exercised by the app.

use wasm_bindgen_test::*;

use tutor_core::auth::AuthStore;
use tutor_core::ports::StoragePort;
use tutor_platform::http::FetchHttp;
use tutor_platform::storage::{open_storage, MemoryStorage};
use tutor_types::auth::{AuthSession, User, UserRole};
use tutor_types::config::{StorageBackendType, TutorConfig};
use std::rc::Rc;

// ─── MemoryStorage Tests ─────────────────────────────────

#[wasm_bindgen_test]
fn memory_storage_backend_name() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn memory_storage_set_get_delete() {
    let storage = MemoryStorage::new();
    assert!(storage.get("k").await.unwrap().is_none());
    storage.set("k", b"v1").await.unwrap();
    storage.set("k", b"v2").await.unwrap();
    assert_eq!(storage.get("k").await.unwrap(), Some(b"v2".to_vec()));
    assert!(storage.exists("k").await.unwrap());
    storage.delete("k").await.unwrap();
    assert!(!storage.exists("k").await.unwrap());
}

#[wasm_bindgen_test]
async fn memory_storage_list_keys_sorted_by_prefix() {
    let storage = MemoryStorage::new();
    storage.set("tutor:b", b"1").await.unwrap();
    storage.set("tutor:a", b"1").await.unwrap();
    storage.set("user", b"1").await.unwrap();
    let keys = storage.list_keys("tutor:").await.unwrap();
    assert_eq!(keys, vec!["tutor:a".to_string(), "tutor:b".to_string()]);
}

#[wasm_bindgen_test]
async fn memory_storage_len_tracks_entries() {
    let storage = MemoryStorage::new();
    assert!(storage.is_empty());
    storage.set("accessToken", b"a").await.unwrap();
    storage.set("refreshToken", b"r").await.unwrap();
    storage.set("accessToken", b"b").await.unwrap();
    assert_eq!(storage.len(), 2);
    storage.delete("missing").await.unwrap();
    assert_eq!(storage.len(), 2);
}

#[wasm_bindgen_test]
async fn memory_storage_backs_auth_store() {
    let storage = Rc::new(MemoryStorage::new());
    let auth = AuthStore::new(storage.clone());
    auth.store(AuthSession {
        access_token: "a".to_string(),
        refresh_token: "r".to_string(),
        user: User {
            id: 1,
            username: "aman".to_string(),
            email: "aman@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            full_name: None,
            role: UserRole::Student,
            is_active: true,
        },
    })
    .await
    .unwrap();
    assert_eq!(storage.get("accessToken").await.unwrap(), Some(b"a".to_vec()));

    let restored = AuthStore::new(storage.clone());
    assert!(restored.restore().await.unwrap().is_some());
    restored.clear().await.unwrap();
    assert!(storage.list_keys("").await.unwrap().is_empty());
}

// ─── Selection & URL Tests ───────────────────────────────

#[wasm_bindgen_test]
fn explicit_memory_backend() {
    let storage = open_storage(&StorageBackendType::Memory).unwrap();
    assert_eq!(storage.backend_name(), "memory");
}

#[wasm_bindgen_test]
fn auto_backend_falls_back_without_window() {
    // Node has no window, so localStorage cannot open.
    let storage = open_storage(&StorageBackendType::Auto).unwrap();
    assert_eq!(storage.backend_name(), "memory");
    assert!(open_storage(&StorageBackendType::LocalStorage).is_err());
}

#[wasm_bindgen_test]
fn fetch_url_joins_base_and_path() {
    let config = TutorConfig {
        api_base_url: "https://tutor.example/api/v1/".to_string(),
        ..TutorConfig::default()
    };
    let http = FetchHttp::new(&config);
    assert_eq!(http.url("/chat/sessions/"), "https://tutor.example/api/v1/chat/sessions/");
}
