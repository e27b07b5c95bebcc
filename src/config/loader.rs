//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// # 环境变量示例
/// - `PODMIX_SERVER__PORT=9000`
/// - `PODMIX_SCRIPT__API_KEY=...`
/// - `PODMIX_SPEECH__REGION=westeurope`
/// - `PODMIX_CACHE__PERSISTENT=false`
/// - `PODMIX_SERVER__CORS_ALLOW_ORIGINS=https://a.example,https://b.example`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时搜索工作目录下的 config.toml / config.local.toml。
/// 缺省值由 serde default 提供
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 前缀 PODMIX_，层级分隔符 __，例如 PODMIX_MIX__MUSIC_GAIN=0.6
    builder = builder.add_source(
        Environment::with_prefix("PODMIX")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("server.cors_allow_origins"),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("Server port cannot be 0"));
    }
    if config.server.max_body_bytes == 0 {
        return Err(invalid("Server max_body_bytes cannot be 0"));
    }

    if config.script.endpoint.trim().is_empty() {
        return Err(invalid("Script endpoint cannot be empty"));
    }
    if config.image.endpoint.trim().is_empty() {
        return Err(invalid("Image endpoint cannot be empty"));
    }
    let speech_target_missing = match &config.speech.endpoint {
        Some(endpoint) => endpoint.trim().is_empty(),
        None => config.speech.region.trim().is_empty(),
    };
    if speech_target_missing {
        return Err(invalid("Speech region or endpoint must be set"));
    }

    config
        .mix
        .to_mix_config()
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    if config.mix.intro_ms < config.mix.fade_to_background_ms {
        return Err(invalid("Intro cannot be shorter than the fade to background"));
    }

    if config.cache.expiry_days == 0 {
        return Err(invalid("Cache expiry must be at least 1 day"));
    }
    if config.cache.persistent && config.cache.db_path.is_empty() {
        return Err(invalid("Cache db_path cannot be empty when persistent"));
    }
    if config.cache.key_prefix.is_empty() {
        return Err(invalid("Cache key prefix cannot be empty"));
    }

    Ok(())
}

/// 密钥只显示末 4 位
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return "<unset>".to_string();
    }
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!(
        "Server: {} (body limit {} bytes, cors {})",
        config.server.addr(),
        config.server.max_body_bytes,
        if config.server.allows_any_origin() {
            "*".to_string()
        } else {
            config.server.cors_allow_origins.join(", ")
        }
    );
    tracing::info!(
        "Script: {} (deployment {}, key {})",
        config.script.endpoint,
        config.script.deployment,
        mask_secret(&config.script.api_key)
    );
    tracing::info!(
        "Speech: region {} (endpoint {:?}, key {})",
        config.speech.region,
        config.speech.endpoint,
        mask_secret(&config.speech.subscription_key)
    );
    tracing::info!(
        "Image: {} (key {})",
        config.image.endpoint,
        mask_secret(&config.image.api_key)
    );
    tracing::info!("Voices: {} / {}", config.voices.host1, config.voices.host2);
    tracing::info!(
        "Mix: music {:?}, intro {}ms, outro {}ms, transition {}ms, gain {}, {} Hz",
        config.mix.music_path,
        config.mix.intro_ms,
        config.mix.outro_fade_ms,
        config.mix.transition_ms,
        config.mix.music_gain,
        config.mix.sample_rate
    );
    if config.cache.persistent {
        tracing::info!(
            "Cache: sled {} (max {} bytes, expiry {} days)",
            config.cache.db_path,
            config.cache.max_size_bytes,
            config.cache.expiry_days
        );
    } else {
        tracing::info!("Cache: in-memory (expiry {} days)", config.cache.expiry_days);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.mix.intro_ms, 3000);
        assert_eq!(config.cache.expiry_days, 7);
        assert!(config.cache.persistent);
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.server.max_body_bytes = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_endpoints() {
        let mut config = AppConfig::default();
        config.script.endpoint = " ".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.speech.region = String::new();
        assert!(validate_config(&config).is_err());
        config.speech.endpoint = Some("http://localhost:9000".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_mix_settings() {
        let mut config = AppConfig::default();
        config.mix.sample_rate = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.mix.intro_ms = 1000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_expiry() {
        let mut config = AppConfig::default();
        config.cache.expiry_days = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9100\ncors_allow_origins = [\"https://podmix.app\"]\n\n[voices]\nhost2 = \"en-GB-SoniaNeural\"\n\n[cache]\npersistent = false"
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.cors_allow_origins, vec!["https://podmix.app".to_string()]);
        assert!(!config.server.allows_any_origin());
        assert_eq!(config.server.max_body_bytes, 1024 * 1024);
        assert_eq!(config.voices.host2, "en-GB-SoniaNeural");
        assert_eq!(config.voices.host1, "en-US-DerekMultilingualNeural");
        assert!(!config.cache.persistent);
        assert_eq!(config.mix.transition_ms, 2000);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "<unset>");
        assert_eq!(mask_secret("abc"), "****");
        assert_eq!(mask_secret("sk-123456"), "****3456");
    }
}
