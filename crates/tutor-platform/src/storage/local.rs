//! localStorage backend.
//! Persistent across reloads and shared by every tab of the origin. Values
//! are stored as UTF-8 strings, so tokens and JSON stay readable in devtools.

use async_trait::async_trait;
use web_sys::Storage;

use tutor_core::ports::StoragePort;
use tutor_types::{Result, TutorError};

use crate::js_error_message;

const WRITE_CHECK_KEY: &str = "__tutor_write_check__";

pub struct LocalStorage {
    storage: Storage,
}

impl LocalStorage {
    /// Open `window.localStorage`, checking that writes are allowed (they
    /// throw in some private browsing modes).
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| TutorError::Storage("No window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| TutorError::Storage(js_error_message(&e)))?
            .ok_or_else(|| TutorError::Storage("localStorage not available".to_string()))?;

        storage
            .set_item(WRITE_CHECK_KEY, "1")
            .and_then(|_| storage.remove_item(WRITE_CHECK_KEY))
            .map_err(|e| TutorError::Storage(js_error_message(&e)))?;

        Ok(Self { storage })
    }
}

#[async_trait(?Send)]
impl StoragePort for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .storage
            .get_item(key)
            .map_err(|e| TutorError::Storage(js_error_message(&e)))?;
        Ok(value.map(String::into_bytes))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let text = std::str::from_utf8(value)
            .map_err(|e| TutorError::Storage(format!("{}: {}", key, e)))?;
        self.storage
            .set_item(key, text)
            .map_err(|e| TutorError::Storage(js_error_message(&e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| TutorError::Storage(js_error_message(&e)))
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let len = self
            .storage
            .length()
            .map_err(|e| TutorError::Storage(js_error_message(&e)))?;
        let mut keys = Vec::new();
        for i in 0..len {
            let key = self
                .storage
                .key(i)
                .map_err(|e| TutorError::Storage(js_error_message(&e)))?;
            if let Some(key) = key.filter(|k| k.starts_with(prefix)) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn backend_name(&self) -> &str {
        "localStorage"
    }
}
