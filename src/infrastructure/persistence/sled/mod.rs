//! Sled 持久化缓存

mod artifact_store;

pub use artifact_store::{SledArtifactStore, SledStoreConfig};
