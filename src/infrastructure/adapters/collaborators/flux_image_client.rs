//! Flux Image Client - 生成封面图
//!
//! POST {endpoint} {"prompt", "n": 1, "size": "1024x1024"}
//! 响应中的 data[0].url / url / data[0].b64_json 统一转为 data URL

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::{ensure_success, send_error};
use crate::application::ports::{CollaboratorError, ImageGeneratorPort};
use crate::domain::podcast::Topic;

/// Flux 图像客户端配置
#[derive(Debug, Clone)]
pub struct FluxImageClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub size: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for FluxImageClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            size: "1024x1024".to_string(),
            timeout_secs: 120,
        }
    }
}

impl FluxImageClientConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: String,
    n: u32,
    size: &'a str,
}

/// 响应中的图片来源
#[derive(Debug, Clone, PartialEq)]
enum ImageSource {
    DataUrl(String),
    Remote(String),
}

pub fn cover_prompt(topic: &Topic) -> String {
    format!(
        "3D rendered podcast cover art about {}, modern 3D design, depth and shadows, vibrant colors, professional lighting, cinematic style, high quality 3D illustration",
        topic
    )
}

fn image_source(body: &Value) -> Option<ImageSource> {
    let url = body["data"][0]["url"]
        .as_str()
        .or_else(|| body["url"].as_str());

    if let Some(url) = url {
        if url.starts_with("data:") {
            return Some(ImageSource::DataUrl(url.to_string()));
        }
        return Some(ImageSource::Remote(url.to_string()));
    }

    body["data"][0]["b64_json"]
        .as_str()
        .map(|b64| ImageSource::DataUrl(format!("data:image/png;base64,{}", b64)))
}

fn to_data_url(content_type: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{}", content_type, encoded)
}

/// Flux 图像客户端
pub struct FluxImageClient {
    client: Client,
    config: FluxImageClientConfig,
}

impl FluxImageClient {
    pub fn new(config: FluxImageClientConfig) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CollaboratorError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 下载远程图片转为 data URL（远程链接会过期，不能直接缓存）
    async fn download(&self, url: &str) -> Result<String, CollaboratorError> {
        let response = self.client.get(url).send().await.map_err(send_error)?;
        let response = ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(format!("Failed to read image: {}", e)))?;

        Ok(to_data_url(&content_type, &bytes))
    }
}

#[async_trait]
impl ImageGeneratorPort for FluxImageClient {
    async fn generate_image(&self, topic: &Topic) -> Result<String, CollaboratorError> {
        let request = ImageRequest {
            prompt: cover_prompt(topic),
            n: 1,
            size: &self.config.size,
        };

        tracing::debug!(topic = %topic, "Sending cover art request");

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;
        let response = ensure_success(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let data_url = match image_source(&body) {
            Some(ImageSource::DataUrl(url)) => url,
            Some(ImageSource::Remote(url)) => self.download(&url).await?,
            None => {
                return Err(CollaboratorError::InvalidResponse(
                    "No image URL returned".to_string(),
                ))
            }
        };

        tracing::info!(topic = %topic, data_url_len = data_url.len(), "Cover art generated");

        Ok(data_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::collaborators::test_server;
    use axum::http::header;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    #[test]
    fn test_image_source_variants() {
        assert_eq!(
            image_source(&json!({ "data": [{ "url": "https://cdn/x.png" }] })),
            Some(ImageSource::Remote("https://cdn/x.png".to_string()))
        );
        assert_eq!(
            image_source(&json!({ "url": "data:image/png;base64,AAA" })),
            Some(ImageSource::DataUrl("data:image/png;base64,AAA".to_string()))
        );
        assert_eq!(
            image_source(&json!({ "data": [{ "b64_json": "QUJD" }] })),
            Some(ImageSource::DataUrl("data:image/png;base64,QUJD".to_string()))
        );
        assert_eq!(image_source(&json!({ "data": [] })), None);
    }

    #[test]
    fn test_prompt_mentions_topic() {
        let prompt = cover_prompt(&Topic::new("deep sea vents").unwrap());
        assert!(prompt.starts_with("3D rendered podcast cover art about deep sea vents,"));
    }

    #[tokio::test]
    async fn test_remote_url_is_downloaded() {
        let cdn = Router::new().route(
            "/image.jpg",
            get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], vec![b'A', b'B', b'C']) }),
        );
        let image_url = format!("{}/image.jpg", test_server::spawn(cdn).await);

        let generator = Router::new().route(
            "/generate",
            post(move |Json(body): Json<Value>| {
                let image_url = image_url.clone();
                async move {
                    let valid = body["n"] == 1 && body["size"] == "1024x1024";
                    let url = if valid { image_url } else { String::new() };
                    Json(json!({ "data": [{ "url": url }] }))
                }
            }),
        );
        let generator_url = test_server::spawn(generator).await;

        let client = FluxImageClient::new(FluxImageClientConfig::new(
            format!("{}/generate", generator_url),
            "k",
        ))
        .unwrap();
        let url = client
            .generate_image(&Topic::new("Rust").unwrap())
            .await
            .unwrap();
        assert_eq!(url, "data:image/jpeg;base64,QUJD");
    }
}
