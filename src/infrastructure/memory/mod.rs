//! Memory Layer - In-Memory State Management
//!
//! 非持久化的产物存储，用于关闭持久缓存的部署和测试

mod artifact_store;

pub use artifact_store::InMemoryArtifactStore;
