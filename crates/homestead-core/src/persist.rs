//! The key/value store that mission progress is saved to.
//!
//! The backend is supplied by the host. [`MemoryStore`] covers tests and
//! headless tools.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Errors raised by a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend failed for key {key:?}: {reason}")]
    Backend { key: String, reason: String },
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A plain object store.
pub trait ProgressStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store. Clones share the same entries, so a caller can inspect
/// what a simulation saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
