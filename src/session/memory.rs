//! Process-local session store.

use std::sync::Arc;

use dashmap::DashMap;

use crate::session::SessionStore;

/// In-memory store; contents are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<DashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        self.inner.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_operations() {
        let store = MemorySessionStore::new();
        assert!(store.get("token").is_none());

        store.set("token", "abc").unwrap();
        assert_eq!(store.get("token").as_deref(), Some("abc"));

        // Clones share state
        let other = store.clone();
        other.set("token", "def").unwrap();
        assert_eq!(store.get("token").as_deref(), Some("def"));

        store.remove("token").unwrap();
        assert!(other.get("token").is_none());
        assert!(store.is_empty());
    }
}
