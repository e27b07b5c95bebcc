//! Collaborator Adapters - 外部生成服务的 HTTP 客户端
//!
//! - OpenAiScriptClient: Azure OpenAI chat completions 生成脚本
//! - AzureSpeechClient: Azure 语音服务合成 SSML
//! - FluxImageClient: Flux 图像服务生成封面图

mod azure_speech_client;
mod flux_image_client;
mod openai_script_client;

pub use azure_speech_client::{AzureSpeechClient, AzureSpeechClientConfig};
pub use flux_image_client::{FluxImageClient, FluxImageClientConfig};
pub use openai_script_client::{OpenAiScriptClient, OpenAiScriptClientConfig};

use reqwest::Response;

use crate::application::ports::CollaboratorError;

/// 发送失败（连接、超时等）
fn send_error(e: reqwest::Error) -> CollaboratorError {
    if e.is_timeout() {
        CollaboratorError::NetworkError(format!("Request timed out: {}", e))
    } else if e.is_connect() {
        CollaboratorError::NetworkError(format!("Cannot connect to service: {}", e))
    } else {
        CollaboratorError::NetworkError(e.to_string())
    }
}

/// 非 2xx 响应转为错误，保留响应体
async fn ensure_success(response: Response) -> Result<Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CollaboratorError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}
