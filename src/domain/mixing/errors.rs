//! Mixing Context - Errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MixError {
    #[error("无效的音频缓冲: {0}")]
    InvalidBuffer(String),

    #[error("无效的增益包络: {0}")]
    InvalidEnvelope(String),

    #[error("无效的混音配置: {0}")]
    InvalidConfig(String),
}
