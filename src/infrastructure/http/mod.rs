//! HTTP Layer - RESTful API

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::{build_router, create_routes};
pub use server::HttpServer;
pub use state::{AppState, PipelineDeps};
