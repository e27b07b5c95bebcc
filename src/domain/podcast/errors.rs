//! Podcast Context - Errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PodcastError {
    #[error("主题不能为空")]
    EmptyTopic,

    #[error("无效的节目时长: {0} 分钟")]
    InvalidDuration(f64),

    #[error("脚本不能为空")]
    EmptyScript,
}
