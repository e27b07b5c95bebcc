//! Cache Key - 产物缓存 key
//!
//! key = 版本前缀 + md5(归一化主题) + 用途后缀
//! 修改前缀即可让旧格式的缓存整体失效

use super::value_objects::{DurationMinutes, Topic};

/// 默认 key 前缀（带版本号）
pub const DEFAULT_KEY_PREFIX: &str = "podcast_cache_v2_";

const MIXED_MARKER: &str = "_mixed_";

/// 缓存用途
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CachePurpose {
    /// 生成的对话脚本
    Script(DurationMinutes),
    /// 封面图（与时长无关）
    Image,
    /// 合成的语音（未混音）
    Audio(DurationMinutes),
    /// 混音后的成品 WAV
    Mixed(DurationMinutes),
}

impl CachePurpose {
    pub fn suffix(&self) -> String {
        match self {
            CachePurpose::Script(d) => format!("_script_{}", d),
            CachePurpose::Image => "_image".to_string(),
            CachePurpose::Audio(d) => format!("_audio_{}", d),
            CachePurpose::Mixed(d) => format!("{}{}", MIXED_MARKER, d),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(prefix: &str, topic: &Topic, purpose: CachePurpose) -> Self {
        let digest = md5::compute(topic.normalized().as_bytes());
        Self(format!("{}{:x}{}", prefix, digest, purpose.suffix()))
    }

    /// 解析外部传入的成品音频 key（只接受 `_mixed_` 用途）
    pub fn parse_mixed(prefix: &str, raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(prefix)?;
        let (digest, duration) = rest.split_once(MIXED_MARKER)?;
        let digest_ok = digest.len() == 32 && digest.chars().all(|c| c.is_ascii_hexdigit());
        let duration_ok = duration.parse::<f64>().is_ok();
        if digest_ok && duration_ok {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
