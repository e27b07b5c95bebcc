//! HTTP Handlers

mod cache;
mod markup;
mod ping;
mod podcast;

pub use cache::*;
pub use markup::*;
pub use ping::*;
pub use podcast::*;
