//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                 GET   健康检查
//! - /api/podcast/generate     POST  生成节目（返回成品 key 与封面图）
//! - /api/podcast/audio/:key   GET   获取成品 WAV
//! - /api/markup/preview       POST  预览脚本编译出的 SSML
//! - /api/cache/stats          GET   缓存统计

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::HeaderValue;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::error_logging_middleware;
use super::state::AppState;
use crate::config::ServerConfig;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// 组装完整的服务 Router：路由 + 请求体上限 + 错误日志 + Trace + CORS
pub fn build_router(state: Arc<AppState>, settings: &ServerConfig) -> Router {
    create_routes()
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(middleware::from_fn(error_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(settings))
        .with_state(state)
}

fn cors_layer(settings: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers(Any)
        .max_age(Duration::from_secs(3600));

    if settings.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/podcast", podcast_routes())
        .route("/markup/preview", post(handlers::preview_markup))
        .route("/cache/stats", get(handlers::cache_stats))
}

/// Podcast 路由
fn podcast_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate", post(handlers::generate_podcast))
        .route("/audio/:key", get(handlers::get_podcast_audio))
}
