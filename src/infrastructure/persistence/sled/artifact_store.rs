//! Sled-based Artifact Store Implementation

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{
    ArtifactStorePort, StoreError, StoreStats, StoredArtifact, DEFAULT_EXPIRY_DAYS,
};

const KEY_PREFIX: &str = "artifact:";

/// Sled 存储配置
#[derive(Debug, Clone)]
pub struct SledStoreConfig {
    /// 数据库路径
    pub db_path: String,
    /// 最大存储大小（字节）
    pub max_size_bytes: u64,
    /// 保留期
    pub retention: Duration,
}

impl Default for SledStoreConfig {
    fn default() -> Self {
        Self {
            db_path: "data/artifacts.sled".to_string(),
            max_size_bytes: 2 * 1024 * 1024 * 1024, // 2GB
            retention: Duration::days(DEFAULT_EXPIRY_DAYS as i64),
        }
    }
}

/// Sled 产物存储
pub struct SledArtifactStore {
    db: Db,
    max_size_bytes: u64,
    retention: Duration,
    current_size: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    expired_count: AtomicU64,
}

impl SledArtifactStore {
    pub fn new(config: &SledStoreConfig) -> Result<Self, StoreError> {
        let db = sled::open(&config.db_path).map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let current_size = Self::calculate_total_size(&db)?;

        tracing::info!(
            db_path = %config.db_path,
            max_size_bytes = config.max_size_bytes,
            current_size = current_size,
            retention_days = config.retention.num_days(),
            "SledArtifactStore initialized"
        );

        Ok(Self {
            db,
            max_size_bytes: config.max_size_bytes,
            retention: config.retention,
            current_size: AtomicU64::new(current_size),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        })
    }

    /// 打开现有存储
    pub fn open<P: AsRef<Path>>(
        path: P,
        max_size_bytes: u64,
        retention: Duration,
    ) -> Result<Self, StoreError> {
        let config = SledStoreConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
            max_size_bytes,
            retention,
        };
        Self::new(&config)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn storage_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    fn decode(value: &[u8]) -> Option<StoredArtifact> {
        bincode::deserialize::<StoredArtifact>(value).ok()
    }

    /// 计算数据库中所有条目的总大小
    fn calculate_total_size(db: &Db) -> Result<u64, StoreError> {
        let mut total = 0u64;
        for item in db.scan_prefix(KEY_PREFIX) {
            let (_, value) = item.map_err(|e| StoreError::DatabaseError(e.to_string()))?;
            if let Some(entry) = Self::decode(&value) {
                total += entry.size_bytes();
            }
        }
        Ok(total)
    }

    /// 删除原始 key，返回是否存在
    fn remove_raw(&self, storage_key: &[u8]) -> Result<bool, StoreError> {
        let removed = self
            .db
            .remove(storage_key)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        match removed {
            Some(value) => {
                if let Some(entry) = Self::decode(&value) {
                    self.current_size.fetch_sub(entry.size_bytes(), Ordering::Relaxed);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 淘汰最早写入的条目，没有可淘汰的条目时返回 false
    fn evict_oldest(&self) -> Result<bool, StoreError> {
        let mut oldest: Option<(sled::IVec, i64)> = None;

        for item in self.db.scan_prefix(KEY_PREFIX) {
            let (key, value) = item.map_err(|e| StoreError::DatabaseError(e.to_string()))?;
            // 损坏的条目优先淘汰
            let created_at = Self::decode(&value).map(|e| e.created_at).unwrap_or(i64::MIN);

            let is_older = oldest
                .as_ref()
                .map(|(_, oldest_at)| created_at < *oldest_at)
                .unwrap_or(true);
            if is_older {
                oldest = Some((key, created_at));
            }
        }

        match oldest {
            Some((key, _)) => {
                self.remove_raw(&key)?;
                tracing::debug!(key = %String::from_utf8_lossy(&key), "Evicted oldest artifact");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStorePort for SledArtifactStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let storage_key = Self::storage_key(key);

        let value = match self.db.get(&storage_key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
            Err(e) => return Err(StoreError::DatabaseError(e.to_string())),
        };

        match Self::decode(&value) {
            Some(entry) if !entry.is_expired() => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.payload))
            }
            Some(_) => {
                self.remove_raw(storage_key.as_bytes())?;
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Expired artifact removed on read");
                Ok(None)
            }
            None => {
                self.remove_raw(storage_key.as_bytes())?;
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, "Corrupt artifact removed on read");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<(), StoreError> {
        let size = payload.len() as u64;
        if size > self.max_size_bytes {
            tracing::warn!(
                key = %key,
                size_bytes = size,
                max_size_bytes = self.max_size_bytes,
                "Artifact larger than store capacity, not stored"
            );
            return Ok(());
        }

        let storage_key = Self::storage_key(key);
        self.remove_raw(storage_key.as_bytes())?;

        // 淘汰以腾出空间
        while self.current_size.load(Ordering::Relaxed) + size > self.max_size_bytes {
            if !self.evict_oldest()? {
                break;
            }
        }

        let entry = StoredArtifact::new(payload, self.retention);
        let entry_bytes =
            bincode::serialize(&entry).map_err(|e| StoreError::SerializationError(e.to_string()))?;

        self.db
            .insert(storage_key, entry_bytes)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        self.current_size.fetch_add(size, Ordering::Relaxed);

        tracing::debug!(key = %key, size_bytes = size, "Artifact stored");

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.remove_raw(Self::storage_key(key).as_bytes())?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now().timestamp_millis();
        let mut stale = Vec::new();

        for item in self.db.scan_prefix(KEY_PREFIX) {
            let (key, value) = item.map_err(|e| StoreError::DatabaseError(e.to_string()))?;
            let keep = Self::decode(&value)
                .map(|entry| !entry.is_expired_at(now))
                .unwrap_or(false);
            if !keep {
                stale.push(key);
            }
        }

        let mut removed = 0;
        for key in stale {
            if self.remove_raw(&key)? {
                removed += 1;
            }
        }
        self.expired_count.fetch_add(removed as u64, Ordering::Relaxed);

        tracing::info!(removed = removed, "Purged expired artifacts");
        Ok(removed)
    }

    async fn stats(&self) -> StoreStats {
        StoreStats {
            total_entries: self.db.scan_prefix(KEY_PREFIX).count(),
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            max_size_bytes: self.max_size_bytes,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            expired_count: self.expired_count.load(Ordering::Relaxed),
        }
    }
}
