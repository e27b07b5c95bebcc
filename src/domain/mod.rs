//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Podcast Context: 主题、时长、缓存键
//! - Markup Context: 对话脚本编译为 SSML
//! - Mixing Context: 语音与背景音乐混音

pub mod markup;
pub mod mixing;
pub mod podcast;
