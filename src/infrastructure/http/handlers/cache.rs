//! Cache Handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::application::{GetCacheStatsQuery, StoreStats};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Serialize)]
pub struct CacheStatsDto {
    pub store: StoreStats,
    pub in_flight: usize,
    pub memo_entries: usize,
}

/// GET /api/cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<CacheStatsDto>> {
    let stats = state.cache_stats_handler.handle(GetCacheStatsQuery).await;

    Json(ApiResponse::success(CacheStatsDto {
        store: stats.store,
        in_flight: stats.in_flight,
        memo_entries: stats.memo_entries,
    }))
}
