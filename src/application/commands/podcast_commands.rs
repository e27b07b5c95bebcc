//! Podcast Commands - 节目生成命令

/// 生成节目命令
#[derive(Debug, Clone)]
pub struct GeneratePodcastCommand {
    pub topic: String,
    pub duration_minutes: f64,
}

/// 生成节目响应
#[derive(Debug, Clone)]
pub struct GeneratePodcastResponse {
    /// 成品 WAV 的缓存 key，用于 GET /api/podcast/audio/:key
    pub audio_key: String,
    /// 封面图 data URL（失败时为占位图）
    pub cover_art: String,
    /// 成品是否直接来自缓存
    pub cached: bool,
    pub duration_ms: u64,
    pub byte_len: usize,
}
