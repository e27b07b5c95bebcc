//! Podcast Queries

use crate::application::ports::{StoreStats, WavInfo};

/// 获取成品音频
#[derive(Debug, Clone)]
pub struct GetMixedAudioQuery {
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct GetMixedAudioResponse {
    pub audio_data: Vec<u8>,
    pub content_type: String,
    pub info: WavInfo,
}

/// 预览脚本编译出的 SSML
#[derive(Debug, Clone)]
pub struct PreviewMarkupQuery {
    pub script: String,
}

#[derive(Debug, Clone)]
pub struct PreviewMarkupResponse {
    pub ssml: String,
    pub voice_count: usize,
    pub pause_count: usize,
}

/// 缓存统计
#[derive(Debug, Clone, Default)]
pub struct GetCacheStatsQuery;

#[derive(Debug, Clone)]
pub struct CacheStatsResponse {
    pub store: StoreStats,
    pub in_flight: usize,
    pub memo_entries: usize,
}
