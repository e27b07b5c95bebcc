//! Markup Handlers

use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::application::PreviewMarkupQuery;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PreviewMarkupRequest {
    pub script: String,
}

/// 预览脚本编译结果
///
/// POST /api/markup/preview，返回 SSML 文档本身（不包 JSON 信封）
pub async fn preview_markup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewMarkupRequest>,
) -> Result<Response, ApiError> {
    let response = state
        .preview_markup_handler
        .handle(PreviewMarkupQuery { script: req.script })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/ssml+xml".to_string()),
            (
                HeaderName::from_static("x-voice-count"),
                response.voice_count.to_string(),
            ),
            (
                HeaderName::from_static("x-pause-count"),
                response.pause_count.to_string(),
            ),
        ],
        response.ssml,
    )
        .into_response())
}
