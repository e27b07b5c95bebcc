//! Collaborator Ports - 外部生成服务抽象
//!
//! 脚本生成、语音合成、封面图生成三个远程服务，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::podcast::{DurationMinutes, Topic};

/// 远程服务错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CollaboratorError {
    /// 非 2xx 响应
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// 网络错误或超时
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CollaboratorError {
    /// HTTP 状态码，网络层失败为 0
    pub fn status(&self) -> u16 {
        match self {
            Self::HttpStatus { status, .. } => *status,
            Self::NetworkError(_) | Self::InvalidResponse(_) => 0,
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::HttpStatus { body, .. } => body.clone(),
            Self::NetworkError(message) | Self::InvalidResponse(message) => message.clone(),
        }
    }
}

/// 脚本生成：(主题, 时长) → 两人对话脚本
#[async_trait]
pub trait ScriptGeneratorPort: Send + Sync {
    async fn generate_script(
        &self,
        topic: &Topic,
        duration: DurationMinutes,
    ) -> Result<String, CollaboratorError>;
}

/// 语音合成：SSML → 压缩音频字节
#[async_trait]
pub trait SpeechSynthesizerPort: Send + Sync {
    async fn synthesize(&self, ssml: &str) -> Result<Vec<u8>, CollaboratorError>;
}

/// 封面图生成：主题 → data URL
#[async_trait]
pub trait ImageGeneratorPort: Send + Sync {
    async fn generate_image(&self, topic: &Topic) -> Result<String, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_have_status_zero() {
        let err = CollaboratorError::NetworkError("connection refused".to_string());
        assert_eq!(err.status(), 0);
        assert_eq!(err.body(), "connection refused");

        let err = CollaboratorError::HttpStatus {
            status: 429,
            body: "too many requests".to_string(),
        };
        assert_eq!(err.status(), 429);
        assert_eq!(err.to_string(), "HTTP 429: too many requests");
    }
}
