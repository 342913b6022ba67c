//! Storage backend selection.
//!
//! Priority: localStorage → Memory (fallback)

use std::rc::Rc;
use tutor_core::ports::StoragePort;
use tutor_types::{config::StorageBackendType, Result};
use super::{LocalStorage, MemoryStorage};

/// Open the best available backend. Never fails: without localStorage the
/// session simply does not survive a reload.
pub fn auto_detect_storage() -> Rc<dyn StoragePort> {
    match LocalStorage::open() {
        Ok(local) => {
            log::info!("Storage backend: localStorage");
            Rc::new(local)
        }
        Err(e) => {
            log::warn!("localStorage unavailable ({}), falling back to memory", e);
            Rc::new(MemoryStorage::new())
        }
    }
}

/// Open the backend the config asks for. An explicit `LocalStorage` that
/// cannot be opened is an error.
pub fn open_storage(kind: &StorageBackendType) -> Result<Rc<dyn StoragePort>> {
    match kind {
        StorageBackendType::Auto => Ok(auto_detect_storage()),
        StorageBackendType::Memory => Ok(Rc::new(MemoryStorage::new())),
        StorageBackendType::LocalStorage => Ok(Rc::new(LocalStorage::open()?)),
    }
}
