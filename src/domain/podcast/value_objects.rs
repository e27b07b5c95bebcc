//! Podcast Context - Value Objects

use serde::{Deserialize, Serialize};

use super::errors::PodcastError;

/// 节目时长上限（分钟）
pub const MAX_DURATION_MINUTES: f64 = 30.0;

/// 节目主题
///
/// 保存去除首尾空白后的原文，缓存 key 使用归一化形式（小写）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PodcastError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PodcastError::EmptyTopic);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 归一化主题：去空白 + 小写
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 目标节目时长（分钟）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationMinutes(f64);

impl DurationMinutes {
    pub fn new(minutes: f64) -> Result<Self, PodcastError> {
        if !minutes.is_finite() || minutes <= 0.0 || minutes > MAX_DURATION_MINUTES {
            return Err(PodcastError::InvalidDuration(minutes));
        }
        Ok(Self(minutes))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// 目标字数（每分钟约 150 词）
    pub fn target_words(&self) -> u32 {
        (self.0 * 150.0).round() as u32
    }
}

impl Default for DurationMinutes {
    fn default() -> Self {
        Self(1.0)
    }
}

/// `1.0` 显示为 `1`，`0.5` 显示为 `0.5`
impl std::fmt::Display for DurationMinutes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 主持人
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Speaker {
    /// 无标签的行默认归属主持人 1
    #[default]
    Host1,
    Host2,
}
