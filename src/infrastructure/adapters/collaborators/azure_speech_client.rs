//! Azure Speech Client - 调用 Azure 语音服务合成 SSML
//!
//! POST https://{region}.tts.speech.microsoft.com/cognitiveservices/v1
//! Body: SSML, Response: 压缩音频（默认 24kHz 单声道 MP3）

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{ensure_success, send_error};
use crate::application::ports::{CollaboratorError, SpeechSynthesizerPort};

/// Azure 语音客户端配置
#[derive(Debug, Clone)]
pub struct AzureSpeechClientConfig {
    pub region: String,
    pub subscription_key: String,
    pub output_format: String,
    /// 覆盖区域 URL（测试或私有部署）
    pub endpoint: Option<String>,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for AzureSpeechClientConfig {
    fn default() -> Self {
        Self {
            region: "eastus".to_string(),
            subscription_key: String::new(),
            output_format: "audio-24khz-160kbitrate-mono-mp3".to_string(),
            endpoint: None,
            timeout_secs: 180,
        }
    }
}

impl AzureSpeechClientConfig {
    pub fn new(region: impl Into<String>, subscription_key: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            subscription_key: subscription_key.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Azure 语音客户端
pub struct AzureSpeechClient {
    client: Client,
    config: AzureSpeechClientConfig,
}

impl AzureSpeechClient {
    pub fn new(config: AzureSpeechClientConfig) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("podmix")
            .build()
            .map_err(|e| CollaboratorError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn synthesis_url(&self) -> String {
        match &self.config.endpoint {
            Some(endpoint) => format!("{}/cognitiveservices/v1", endpoint.trim_end_matches('/')),
            None => format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                self.config.region
            ),
        }
    }
}

#[async_trait]
impl SpeechSynthesizerPort for AzureSpeechClient {
    async fn synthesize(&self, ssml: &str) -> Result<Vec<u8>, CollaboratorError> {
        tracing::debug!(
            url = %self.synthesis_url(),
            ssml_len = ssml.len(),
            output_format = %self.config.output_format,
            "Sending speech synthesis request"
        );

        let response = self
            .client
            .post(self.synthesis_url())
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", &self.config.output_format)
            .body(ssml.to_string())
            .send()
            .await
            .map_err(send_error)?;
        let response = ensure_success(response).await?;

        let audio = response
            .bytes()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        if audio.is_empty() {
            return Err(CollaboratorError::InvalidResponse("Empty audio response".to_string()));
        }

        tracing::info!(audio_size = audio.len(), "Speech synthesized");

        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::collaborators::test_server;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;

    #[test]
    fn test_regional_url() {
        let client = AzureSpeechClient::new(AzureSpeechClientConfig::new("westeurope", "k")).unwrap();
        assert_eq!(
            client.synthesis_url(),
            "https://westeurope.tts.speech.microsoft.com/cognitiveservices/v1"
        );
    }

    #[tokio::test]
    async fn test_synthesize_sends_ssml() {
        let router = Router::new().route(
            "/cognitiveservices/v1",
            post(|headers: HeaderMap, body: String| async move {
                let ok = headers.get("Ocp-Apim-Subscription-Key").map(|v| v == "key").unwrap_or(false)
                    && headers.get("Content-Type").map(|v| v == "application/ssml+xml").unwrap_or(false)
                    && headers
                        .get("X-Microsoft-OutputFormat")
                        .map(|v| v == "audio-24khz-160kbitrate-mono-mp3")
                        .unwrap_or(false)
                    && body.starts_with("<speak");
                if ok {
                    (StatusCode::OK, vec![1u8, 2, 3])
                } else {
                    (StatusCode::BAD_REQUEST, Vec::new())
                }
            }),
        );
        let base_url = test_server::spawn(router).await;

        let client = AzureSpeechClient::new(
            AzureSpeechClientConfig::new("eastus", "key").with_endpoint(base_url),
        )
        .unwrap();
        let audio = client.synthesize("<speak></speak>").await.unwrap();
        assert_eq!(audio, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_status() {
        let router = Router::new().route(
            "/cognitiveservices/v1",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid key") }),
        );
        let base_url = test_server::spawn(router).await;

        let client = AzureSpeechClient::new(
            AzureSpeechClientConfig::new("eastus", "bad").with_endpoint(base_url),
        )
        .unwrap();
        let err = client.synthesize("<speak/>").await.unwrap_err();
        assert_eq!(err.status(), 401);
        assert_eq!(err.body(), "invalid key");
    }

    #[tokio::test]
    async fn test_unreachable_service_has_status_zero() {
        let client = AzureSpeechClient::new(
            AzureSpeechClientConfig::new("eastus", "k").with_endpoint("http://127.0.0.1:1"),
        )
        .unwrap();
        let err = client.synthesize("<speak/>").await.unwrap_err();
        assert_eq!(err.status(), 0);
    }
}
