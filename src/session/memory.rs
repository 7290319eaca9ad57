//! In-process session store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{SessionError, SessionRecord, SessionStore};
use crate::types::SessionId;

/// Thread-safe in-memory session store.
///
/// Sessions are lost on restart, which matches the fixed-lifetime model:
/// users simply log in again.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionRecord>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired record. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let before = sessions.len();

        sessions.retain(|_, record| record.expires_at > now);

        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Purged expired sessions");
        }
        removed
    }

    /// Number of stored records, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                None => return Ok(None),
                Some(record) if !record.is_expired() => return Ok(Some(record.clone())),
                Some(_) => {}
            }
        }

        // Expired: evict under the write lock, re-checking in case it was replaced
        let mut sessions = self.sessions.write().await;
        if sessions.get(id).is_some_and(|r| r.is_expired()) {
            sessions.remove(id);
            debug!(session_id = %id, "Evicted expired session");
        }
        Ok(sessions.get(id).cloned())
    }

    async fn save(&self, id: &SessionId, record: SessionRecord) -> Result<(), SessionError> {
        self.sessions.write().await.insert(id.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_save_load_delete() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();

        assert!(store.load(&id).await.unwrap().is_none());

        store
            .save(&id, SessionRecord::new(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(store.load(&id).await.unwrap().is_some());

        store.delete(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap().is_none());

        // Deleting twice is fine
        store.delete(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_record_reads_as_absent() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();

        store.save(&id, SessionRecord::new(Duration::ZERO)).await.unwrap();

        assert!(store.load(&id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemorySessionStore::new();
        store
            .save(&SessionId::generate(), SessionRecord::new(Duration::ZERO))
            .await
            .unwrap();
        store
            .save(&SessionId::generate(), SessionRecord::new(Duration::from_secs(60)))
            .await
            .unwrap();

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_independent_sessions() {
        let store = MemorySessionStore::new();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let id = SessionId::generate();
                    store
                        .save(&id, SessionRecord::new(Duration::from_secs(60)))
                        .await
                        .unwrap();
                    store.load(&id).await.unwrap().is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(store.len().await, 32);
    }
}
