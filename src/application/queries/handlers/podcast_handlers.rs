//! Podcast Query Handlers

use std::sync::Arc;

use crate::application::coalescer::RequestCoalescer;
use crate::application::error::ApplicationError;
use crate::application::ports::{ArtifactStorePort, AudioCodecPort};
use crate::application::queries::podcast_queries::*;
use crate::domain::markup::MarkupCompiler;
use crate::domain::podcast::{CacheKey, PodcastError};

/// GetMixedAudio Handler - 读取成品 WAV
pub struct GetMixedAudioHandler {
    store: Arc<dyn ArtifactStorePort>,
    codec: Arc<dyn AudioCodecPort>,
    key_prefix: String,
}

impl GetMixedAudioHandler {
    pub fn new(
        store: Arc<dyn ArtifactStorePort>,
        codec: Arc<dyn AudioCodecPort>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            codec,
            key_prefix: key_prefix.into(),
        }
    }

    pub async fn handle(
        &self,
        query: GetMixedAudioQuery,
    ) -> Result<GetMixedAudioResponse, ApplicationError> {
        // 只允许读取成品音频，脚本等其他产物不对外暴露
        let key = CacheKey::parse_mixed(&self.key_prefix, &query.key)
            .ok_or_else(|| ApplicationError::input(format!("Invalid audio key: {}", query.key)))?;

        let audio_data = self
            .store
            .get(key.as_str())
            .await?
            .ok_or_else(|| ApplicationError::not_found("Audio", key.as_str()))?;

        let info = self.codec.probe_wav(&audio_data)?;

        Ok(GetMixedAudioResponse {
            audio_data,
            content_type: "audio/wav".to_string(),
            info,
        })
    }
}

/// PreviewMarkup Handler - 脚本 → SSML
pub struct PreviewMarkupHandler {
    compiler: Arc<MarkupCompiler>,
}

impl PreviewMarkupHandler {
    pub fn new(compiler: Arc<MarkupCompiler>) -> Self {
        Self { compiler }
    }

    pub fn handle(&self, query: PreviewMarkupQuery) -> Result<PreviewMarkupResponse, ApplicationError> {
        if query.script.trim().is_empty() {
            return Err(PodcastError::EmptyScript.into());
        }

        let document = self.compiler.compile(&query.script);
        Ok(PreviewMarkupResponse {
            ssml: document.render(),
            voice_count: document.voice_count(),
            pause_count: document.pause_count(),
        })
    }
}

/// GetCacheStats Handler
pub struct GetCacheStatsHandler {
    coalescer: RequestCoalescer,
    compiler: Arc<MarkupCompiler>,
}

impl GetCacheStatsHandler {
    pub fn new(coalescer: RequestCoalescer, compiler: Arc<MarkupCompiler>) -> Self {
        Self {
            coalescer,
            compiler,
        }
    }

    pub async fn handle(&self, _query: GetCacheStatsQuery) -> CacheStatsResponse {
        CacheStatsResponse {
            store: self.coalescer.store().stats().await,
            in_flight: self.coalescer.in_flight_count(),
            memo_entries: self.compiler.memo_len(),
        }
    }
}
