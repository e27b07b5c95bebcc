//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：成品音频、SSML 预览、缓存统计

mod podcast_queries;

pub mod handlers;

pub use podcast_queries::*;
