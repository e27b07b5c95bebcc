//! OpenAI Script Client - 调用 Azure OpenAI 生成对话脚本
//!
//! POST {endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}
//! Header: api-key
//! Response: choices[0].message.content

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ensure_success, send_error};
use crate::application::ports::{CollaboratorError, ScriptGeneratorPort};
use crate::domain::podcast::{DurationMinutes, Topic};

const MAX_TOKENS_CAP: u32 = 4000;

const OPENING_LINE: &str = "Host 1: [warm] Hey everyone, welcome! Today we're diving into [topic].";
const CLOSING_LINE: &str = "Host 1: [warm] Alright, that's it for today. Thanks for tuning in!";

const STYLE_GUIDE: &str = r#"You are a professional podcast script writer. Create a realistic, "unscripted" conversation between two hosts (Host 1 and Host 2) that feels relaxed, curious, and willingly engaged, never forced. Think mellow long-form chat, not morning radio hype.

STYLE GUIDE:
- Casual & imperfect: sprinkle light filler words naturally (um, ah, like, you know, I mean) but don't spam them.
- Expressive cues: use [laugh], [sigh], [gasp], [clears throat] sparingly to guide delivery (do NOT write "ha ha ha").
- Tone cues: use [excited], [whisper], [thoughtful], [warm] at the start of sentences to set mood; avoid shouting.
- Interjections: "Right?", "Exactly.", "No way.", "Wait, really?", "I get that." to keep it conversational.
- Vibe: unhurried, curious, sometimes amused; sounds like they *want* to be there.

FORMAT (example):
Host 1: [warm] Hey everyone, settle in.
Host 2: [thoughtful] This topic is wild. I love it.
Host 1: Totally. It's kind of blowing my mind."#;

/// OpenAI 脚本客户端配置
#[derive(Debug, Clone)]
pub struct OpenAiScriptClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub temperature: f32,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for OpenAiScriptClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: "gpt-4o".to_string(),
            api_version: "2024-02-15-preview".to_string(),
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

impl OpenAiScriptClientConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// 系统提示词：风格说明 + 固定开场/结束语 + 长度要求
pub fn system_prompt(duration: DurationMinutes) -> String {
    let words = duration.target_words();
    let length_guidance = if duration.value() <= 1.0 {
        format!(
            "Keep the main conversation under {} minute (~{} words total).",
            duration, words
        )
    } else {
        format!(
            "Keep the main conversation around {} minutes (~{} words total).",
            duration, words
        )
    };

    format!(
        "{}\n\nIMPORTANT:\n- START with: \"{}\"\n- END with: \"{}\"\n\nLENGTH: {}",
        STYLE_GUIDE, OPENING_LINE, CLOSING_LINE, length_guidance
    )
}

/// max_tokens 随时长增长，上限 4000
pub fn max_tokens(duration: DurationMinutes) -> u32 {
    ((duration.target_words() as f64 * 2.5).round() as u32).min(MAX_TOKENS_CAP)
}

/// OpenAI 脚本客户端
pub struct OpenAiScriptClient {
    client: Client,
    config: OpenAiScriptClientConfig,
}

impl OpenAiScriptClient {
    pub fn new(config: OpenAiScriptClientConfig) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CollaboratorError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }
}

#[async_trait]
impl ScriptGeneratorPort for OpenAiScriptClient {
    async fn generate_script(
        &self,
        topic: &Topic,
        duration: DurationMinutes,
    ) -> Result<String, CollaboratorError> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(duration),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Generate a podcast conversation about: {}", topic),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: max_tokens(duration),
        };

        tracing::debug!(
            url = %self.completions_url(),
            topic = %topic,
            max_tokens = request.max_tokens,
            "Sending script generation request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;
        let response = ensure_success(response).await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let script = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CollaboratorError::InvalidResponse("No choices returned".to_string()))?;

        tracing::info!(topic = %topic, script_len = script.len(), "Script generated");

        Ok(script)
    }
}
