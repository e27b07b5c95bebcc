//! In-Memory Artifact Store Implementation

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{ArtifactStorePort, StoreError, StoreStats, StoredArtifact};

/// 内存产物存储
pub struct InMemoryArtifactStore {
    /// key -> StoredArtifact
    entries: DashMap<String, StoredArtifact>,
    retention: Duration,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    expired_count: AtomicU64,
}

impl InMemoryArtifactStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            retention,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 直接写入条目（保留原有时间戳）
    pub fn insert_entry(&self, key: impl Into<String>, entry: StoredArtifact) {
        self.entries.insert(key.into(), entry);
    }
}

#[async_trait]
impl ArtifactStorePort for InMemoryArtifactStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        // remove_if 保证检查与删除是原子的
        let expired = self.entries.remove_if(key, |_, entry| entry.is_expired());
        if expired.is_some() {
            self.expired_count.fetch_add(1, Ordering::Relaxed);
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        match self.entries.get(key) {
            Some(entry) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.payload.clone()))
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<(), StoreError> {
        self.entries
            .insert(key.to_string(), StoredArtifact::new(payload, self.retention));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now().timestamp_millis();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before.saturating_sub(self.entries.len());
        self.expired_count.fetch_add(removed as u64, Ordering::Relaxed);
        Ok(removed)
    }

    async fn stats(&self) -> StoreStats {
        StoreStats {
            total_entries: self.entries.len(),
            total_size_bytes: self.entries.iter().map(|e| e.size_bytes()).sum(),
            max_size_bytes: 0,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            expired_count: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired_entry() -> StoredArtifact {
        let now = Utc::now().timestamp_millis();
        StoredArtifact {
            payload: vec![1],
            created_at: now - 1_000,
            expires_at: now - 1,
        }
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = InMemoryArtifactStore::new(Duration::days(7));
        store.put("k", vec![1, 2]).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(vec![1, 2]));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);

        let stats = store.stats().await;
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_never_returned() {
        let store = InMemoryArtifactStore::new(Duration::days(7));
        store.insert_entry("old", expired_entry());

        assert_eq!(store.get("old").await.unwrap(), None);
        assert_eq!(store.stats().await.total_entries, 0);
        assert_eq!(store.stats().await.expired_count, 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemoryArtifactStore::new(Duration::days(7));
        store.insert_entry("a", expired_entry());
        store.insert_entry("b", expired_entry());
        store.put("c", vec![3]).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 2);
        assert_eq!(store.stats().await.total_entries, 1);
    }
}
