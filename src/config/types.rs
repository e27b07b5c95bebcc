//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::application::DEFAULT_EXPIRY_DAYS;
use crate::domain::markup::VoiceMap;
use crate::domain::mixing::MixConfig;
use crate::domain::podcast::DEFAULT_KEY_PREFIX;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 脚本生成服务（Azure OpenAI）
    #[serde(default)]
    pub script: ScriptConfig,

    /// 语音合成服务（Azure Speech）
    #[serde(default)]
    pub speech: SpeechConfig,

    /// 封面图服务（Flux）
    #[serde(default)]
    pub image: ImageConfig,

    /// 主持人音色
    #[serde(default)]
    pub voices: VoicesConfig,

    /// 混音参数
    #[serde(default)]
    pub mix: MixSettings,

    /// 产物缓存
    #[serde(default)]
    pub cache: CacheConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 请求体上限（字节）
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// 允许跨域的来源，为空或包含 "*" 时允许任意来源
    #[serde(default)]
    pub cors_allow_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            cors_allow_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// 是否允许任意来源跨域
    pub fn allows_any_origin(&self) -> bool {
        self.cors_allow_origins.is_empty() || self.cors_allow_origins.iter().any(|o| o.trim() == "*")
    }

    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 脚本生成服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    #[serde(default = "default_script_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_deployment")]
    pub deployment: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_script_timeout")]
    pub timeout_secs: u64,
}

fn default_script_endpoint() -> String {
    "https://localhost".to_string()
}

fn default_deployment() -> String {
    "gpt-4o".to_string()
}

fn default_api_version() -> String {
    "2024-02-15-preview".to_string()
}

fn default_script_timeout() -> u64 {
    120
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            endpoint: default_script_endpoint(),
            api_key: String::new(),
            deployment: default_deployment(),
            api_version: default_api_version(),
            timeout_secs: default_script_timeout(),
        }
    }
}

/// 语音合成服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub subscription_key: String,

    /// 覆盖区域 URL
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_output_format")]
    pub output_format: String,

    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,
}

fn default_region() -> String {
    "eastus".to_string()
}

fn default_output_format() -> String {
    "audio-24khz-160kbitrate-mono-mp3".to_string()
}

fn default_speech_timeout() -> u64 {
    180
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            subscription_key: String::new(),
            endpoint: None,
            output_format: default_output_format(),
            timeout_secs: default_speech_timeout(),
        }
    }
}

/// 封面图服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_image_size")]
    pub size: String,

    #[serde(default = "default_script_timeout")]
    pub timeout_secs: u64,
}

fn default_image_endpoint() -> String {
    "https://localhost/images/generations".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_image_endpoint(),
            api_key: String::new(),
            size: default_image_size(),
            timeout_secs: default_script_timeout(),
        }
    }
}

/// 主持人音色配置
#[derive(Debug, Clone, Deserialize)]
pub struct VoicesConfig {
    #[serde(default = "default_host1_voice")]
    pub host1: String,

    #[serde(default = "default_host2_voice")]
    pub host2: String,
}

fn default_host1_voice() -> String {
    VoiceMap::default().host1
}

fn default_host2_voice() -> String {
    VoiceMap::default().host2
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            host1: default_host1_voice(),
            host2: default_host2_voice(),
        }
    }
}

impl VoicesConfig {
    pub fn to_voice_map(&self) -> VoiceMap {
        VoiceMap {
            host1: self.host1.clone(),
            host2: self.host2.clone(),
        }
    }
}

/// 混音配置
#[derive(Debug, Clone, Deserialize)]
pub struct MixSettings {
    /// 背景音乐文件（MP3 或 WAV）
    #[serde(default = "default_music_path")]
    pub music_path: PathBuf,

    #[serde(default = "default_intro_ms")]
    pub intro_ms: u64,

    #[serde(default = "default_fade_to_background_ms")]
    pub fade_to_background_ms: u64,

    #[serde(default = "default_outro_fade_ms")]
    pub outro_fade_ms: u64,

    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,

    #[serde(default = "default_music_gain")]
    pub music_gain: f32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_music_path() -> PathBuf {
    PathBuf::from("assets/music.mp3")
}

fn default_intro_ms() -> u64 {
    MixConfig::default().intro_ms
}

fn default_fade_to_background_ms() -> u64 {
    MixConfig::default().fade_to_background_ms
}

fn default_outro_fade_ms() -> u64 {
    MixConfig::default().outro_fade_ms
}

fn default_transition_ms() -> u64 {
    MixConfig::default().transition_ms
}

fn default_music_gain() -> f32 {
    MixConfig::default().music_gain
}

fn default_sample_rate() -> u32 {
    MixConfig::default().sample_rate
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            music_path: default_music_path(),
            intro_ms: default_intro_ms(),
            fade_to_background_ms: default_fade_to_background_ms(),
            outro_fade_ms: default_outro_fade_ms(),
            transition_ms: default_transition_ms(),
            music_gain: default_music_gain(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl MixSettings {
    pub fn to_mix_config(&self) -> MixConfig {
        MixConfig {
            intro_ms: self.intro_ms,
            fade_to_background_ms: self.fade_to_background_ms,
            outro_fade_ms: self.outro_fade_ms,
            transition_ms: self.transition_ms,
            music_gain: self.music_gain,
            sample_rate: self.sample_rate,
        }
    }
}

/// 产物缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// false 时使用内存存储，重启后丢失
    #[serde(default = "default_persistent")]
    pub persistent: bool,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    #[serde(default = "default_expiry_days")]
    pub expiry_days: u32,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_persistent() -> bool {
    true
}

fn default_db_path() -> String {
    "data/artifacts.sled".to_string()
}

fn default_max_size_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_expiry_days() -> u32 {
    DEFAULT_EXPIRY_DAYS
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistent: default_persistent(),
            db_path: default_db_path(),
            max_size_bytes: default_max_size_bytes(),
            expiry_days: default_expiry_days(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl CacheConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.expiry_days))
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
