//! Artifact Store Port - 产物持久化缓存
//!
//! 定义持久化缓存的抽象接口，具体实现使用 Sled（持久）或 DashMap（内存）

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 默认保留天数
pub const DEFAULT_EXPIRY_DAYS: u32 = 7;

/// Artifact Store 错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// 存储条目
///
/// 时间戳均为毫秒
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub payload: Vec<u8>,
    pub created_at: i64,
    pub expires_at: i64,
}

impl StoredArtifact {
    pub fn new(payload: Vec<u8>, retention: Duration) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            payload,
            created_at: now,
            expires_at: now + retention.num_milliseconds(),
        }
    }

    /// 到期时刻本身仍有效，之后才算过期
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }

    pub fn size_bytes(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// 存储统计信息
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub expired_count: u64,
}

/// Artifact Store Port
///
/// 过期或损坏的条目在读取时删除并视为不存在
#[async_trait]
pub trait ArtifactStorePort: Send + Sync {
    /// 读取未过期的条目
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// 写入条目，过期时间为 now + 保留期
    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// 清理所有过期或损坏的条目，返回删除数量
    async fn purge_expired(&self) -> Result<usize, StoreError>;

    async fn stats(&self) -> StoreStats;
}
