//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：节目生成

mod podcast_commands;

pub mod handlers;

pub use podcast_commands::*;
