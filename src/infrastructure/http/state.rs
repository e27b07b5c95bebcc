//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::{
    ArtifactStorePort, AudioCodecPort, GeneratePodcastHandler, GetCacheStatsHandler,
    GetMixedAudioHandler, PodcastCollaborators, PreviewMarkupHandler, RequestCoalescer,
};
use crate::domain::markup::MarkupCompiler;
use crate::domain::mixing::{AudioBuffer, MixConfig};

/// 流水线装配所需的依赖
pub struct PipelineDeps {
    pub store: Arc<dyn ArtifactStorePort>,
    pub collaborators: PodcastCollaborators,
    pub codec: Arc<dyn AudioCodecPort>,
    pub compiler: Arc<MarkupCompiler>,
    /// 启动时解码好的背景音乐
    pub music: Arc<AudioBuffer>,
    pub mix_config: MixConfig,
    pub key_prefix: String,
}

/// 应用状态
pub struct AppState {
    // ========== Command Handlers ==========
    pub generate_podcast_handler: GeneratePodcastHandler,

    // ========== Query Handlers ==========
    pub get_mixed_audio_handler: GetMixedAudioHandler,
    pub preview_markup_handler: PreviewMarkupHandler,
    pub cache_stats_handler: GetCacheStatsHandler,
}

impl AppState {
    /// 创建应用状态
    ///
    /// 所有 handler 共享同一个 coalescer（同一张在途请求表）
    pub fn new(deps: PipelineDeps) -> Self {
        let coalescer = RequestCoalescer::new(deps.store.clone());

        Self {
            generate_podcast_handler: GeneratePodcastHandler::new(
                coalescer.clone(),
                deps.collaborators,
                deps.codec.clone(),
                deps.compiler.clone(),
                deps.music,
                deps.mix_config,
                deps.key_prefix.clone(),
            ),
            get_mixed_audio_handler: GetMixedAudioHandler::new(
                deps.store,
                deps.codec,
                deps.key_prefix,
            ),
            preview_markup_handler: PreviewMarkupHandler::new(deps.compiler.clone()),
            cache_stats_handler: GetCacheStatsHandler::new(coalescer, deps.compiler),
        }
    }
}
