//! Podcast Handlers

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::{GeneratePodcastCommand, GetMixedAudioQuery};
use crate::domain::podcast::DurationMinutes;
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GeneratePodcastRequest {
    pub topic: String,
    /// 目标时长（分钟），缺省为 1
    #[serde(default = "default_duration")]
    pub duration_minutes: f64,
}

fn default_duration() -> f64 {
    DurationMinutes::default().value()
}

#[derive(Debug, Serialize)]
pub struct GeneratePodcastResponseDto {
    pub audio_key: String,
    pub audio_url: String,
    pub cover_art: String,
    pub cached: bool,
    pub duration_ms: u64,
    pub byte_len: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// 生成节目
///
/// POST /api/podcast/generate
pub async fn generate_podcast(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GeneratePodcastRequest>,
) -> Result<Json<ApiResponse<GeneratePodcastResponseDto>>, ApiError> {
    let cmd = GeneratePodcastCommand {
        topic: req.topic,
        duration_minutes: req.duration_minutes,
    };

    let response = state.generate_podcast_handler.handle(cmd).await?;

    Ok(Json(ApiResponse::success(GeneratePodcastResponseDto {
        audio_url: format!("/api/podcast/audio/{}", response.audio_key),
        audio_key: response.audio_key,
        cover_art: response.cover_art,
        cached: response.cached,
        duration_ms: response.duration_ms,
        byte_len: response.byte_len,
    })))
}

/// 获取成品音频
///
/// GET /api/podcast/audio/:key
pub async fn get_podcast_audio(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let response = state
        .get_mixed_audio_handler
        .handle(GetMixedAudioQuery { key })
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, response.content_type),
            (header::CONTENT_LENGTH, response.audio_data.len().to_string()),
            (
                header::HeaderName::from_static("x-audio-duration-ms"),
                response.info.duration_ms().to_string(),
            ),
        ],
        response.audio_data,
    )
        .into_response())
}
