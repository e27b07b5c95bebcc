//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod codec;
pub mod collaborators;

pub use codec::*;
pub use collaborators::*;
