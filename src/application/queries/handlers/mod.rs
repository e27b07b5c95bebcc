//! Query Handlers 实现

mod podcast_handlers;

pub use podcast_handlers::*;
