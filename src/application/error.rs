//! 应用层错误定义
//!
//! 统一的命令/查询错误类型。需要 Clone：合并的并发请求共享同一个结果

use serde::Serialize;
use thiserror::Error;

use crate::application::ports::{CodecError, CollaboratorError, StoreError};
use crate::domain::mixing::MixError;
use crate::domain::podcast::PodcastError;

/// 流水线阶段，用于定位需要重试的环节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Script,
    Image,
    Speech,
    Mixing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Script => write!(f, "script"),
            Stage::Image => write!(f, "image"),
            Stage::Speech => write!(f, "speech"),
            Stage::Mixing => write!(f, "mixing"),
        }
    }
}

/// 应用层错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplicationError {
    /// 输入无效（主题为空、时长非法等）
    #[error("Input error: {0}")]
    InputError(String),

    /// 远程服务失败，网络错误 status 为 0
    #[error("{stage} service failed (status {status}): {body}")]
    CollaboratorError {
        stage: Stage,
        status: u16,
        body: String,
    },

    /// 音频解码失败
    #[error("{stage} decode error: {message}")]
    DecodeError { stage: Stage, message: String },

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputError(message.into())
    }

    pub fn collaborator(stage: Stage, err: &CollaboratorError) -> Self {
        Self::CollaboratorError {
            stage,
            status: err.status(),
            body: err.body(),
        }
    }

    pub fn decode(stage: Stage, message: impl Into<String>) -> Self {
        Self::DecodeError {
            stage,
            message: message.into(),
        }
    }

    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 出错的阶段（如果有）
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::CollaboratorError { stage, .. } | Self::DecodeError { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<PodcastError> for ApplicationError {
    fn from(err: PodcastError) -> Self {
        Self::InputError(err.to_string())
    }
}

impl From<StoreError> for ApplicationError {
    fn from(err: StoreError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<MixError> for ApplicationError {
    fn from(err: MixError) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<CodecError> for ApplicationError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::EncodingError(message) => Self::EncodeError(message),
            other => Self::decode(Stage::Mixing, other.to_string()),
        }
    }
}
