//! Podmix - AI 播客生成服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - markup: 对话脚本 → SSML 编译（音色、情绪韵律、停顿）
//! - mixing: 语音 + 背景音乐混音（增益包络）
//! - podcast: 主题、时长、缓存 key
//!
//! 应用层 (application/):
//! - Ports: 端口定义（ArtifactStore, AudioCodec, 外部生成服务）
//! - Coalescer: 相同 key 的并发请求只计算一次
//! - Commands / Queries: CQRS 处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API
//! - Persistence: Sled 产物存储
//! - Memory: 内存产物存储
//! - Adapters: 脚本/语音/封面图客户端，Symphonia 解码 + WAV 编码

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
