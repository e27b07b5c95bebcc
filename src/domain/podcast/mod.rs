//! Podcast Context - 节目请求与产物缓存 key

mod cache_key;
mod errors;
mod value_objects;

pub use cache_key::{CacheKey, CachePurpose, DEFAULT_KEY_PREFIX};
pub use errors::PodcastError;
pub use value_objects::{DurationMinutes, Speaker, Topic, MAX_DURATION_MINUTES};
