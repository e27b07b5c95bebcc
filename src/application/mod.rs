//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（ArtifactStore、AudioCodec、外部生成服务）
//! - coalescer: 并发请求合并 + 持久化缓存
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod coalescer;
pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use coalescer::RequestCoalescer;

pub use commands::{
    handlers::{decode_music, render_podcast, GeneratePodcastHandler, PodcastCollaborators, PLACEHOLDER_COVER_ART},
    GeneratePodcastCommand, GeneratePodcastResponse,
};

pub use error::{ApplicationError, Stage};

pub use ports::{
    // Artifact store
    ArtifactStorePort,
    StoreError,
    StoreStats,
    StoredArtifact,
    DEFAULT_EXPIRY_DAYS,
    // Audio codec
    AudioCodecPort,
    CodecError,
    WavInfo,
    // Collaborators
    CollaboratorError,
    ImageGeneratorPort,
    ScriptGeneratorPort,
    SpeechSynthesizerPort,
};

pub use queries::{
    handlers::{GetCacheStatsHandler, GetMixedAudioHandler, PreviewMarkupHandler},
    CacheStatsResponse, GetCacheStatsQuery, GetMixedAudioQuery, GetMixedAudioResponse,
    PreviewMarkupQuery, PreviewMarkupResponse,
};
