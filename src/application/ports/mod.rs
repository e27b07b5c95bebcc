//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod artifact_store;
mod audio_codec;
mod collaborators;

pub use artifact_store::{
    ArtifactStorePort, StoreError, StoreStats, StoredArtifact, DEFAULT_EXPIRY_DAYS,
};
pub use audio_codec::{AudioCodecPort, CodecError, WavInfo};
pub use collaborators::{
    CollaboratorError, ImageGeneratorPort, ScriptGeneratorPort, SpeechSynthesizerPort,
};
