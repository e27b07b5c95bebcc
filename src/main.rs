//! Podmix - AI 播客生成服务

use std::sync::Arc;

use anyhow::Context;
use podmix::application::{decode_music, ArtifactStorePort, PodcastCollaborators};
use podmix::config::{load_config, print_config, AppConfig};
use podmix::domain::markup::MarkupCompiler;
use podmix::infrastructure::adapters::{
    AzureSpeechClient, AzureSpeechClientConfig, FluxImageClient, FluxImageClientConfig,
    OpenAiScriptClient, OpenAiScriptClientConfig, SymphoniaCodec,
};
use podmix::infrastructure::http::{AppState, HttpServer, PipelineDeps};
use podmix::infrastructure::memory::InMemoryArtifactStore;
use podmix::infrastructure::persistence::{SledArtifactStore, SledStoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().context("Failed to load config")?;

    // 初始化日志
    let log_filter = format!(
        "{},podmix={},tower_http=debug",
        config.log.level, config.log.level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Podmix - AI 播客生成服务");
    print_config(&config);

    let store = build_store(&config).await?;

    // 启动时清理过期产物
    match store.purge_expired().await {
        Ok(purged) => tracing::info!(purged, "Expired artifacts purged"),
        Err(e) => tracing::warn!(error = %e, "Failed to purge expired artifacts"),
    }

    let codec = Arc::new(SymphoniaCodec::new());
    let music_bytes = tokio::fs::read(&config.mix.music_path)
        .await
        .with_context(|| format!("Failed to read background music {:?}", config.mix.music_path))?;
    // 启动时解码一次，坏文件直接失败
    let music = {
        let codec = codec.clone();
        tokio::task::spawn_blocking(move || decode_music(codec.as_ref(), &music_bytes))
            .await
            .context("Background music decode task failed")?
            .with_context(|| format!("Failed to decode background music {:?}", config.mix.music_path))?
    };
    tracing::info!(
        sample_rate = music.sample_rate(),
        frames = music.frames(),
        "Background music decoded"
    );

    let collaborators = build_collaborators(&config)?;

    let state = AppState::new(PipelineDeps {
        store,
        collaborators,
        codec,
        compiler: Arc::new(MarkupCompiler::new(config.voices.to_voice_map())),
        music: Arc::new(music),
        mix_config: config.mix.to_mix_config(),
        key_prefix: config.cache.key_prefix.clone(),
    });

    let server = HttpServer::bind(&config.server, state)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr()))?;

    // 启动服务器（带优雅关闭）
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ArtifactStorePort>> {
    if !config.cache.persistent {
        return Ok(InMemoryArtifactStore::new(config.cache.retention()).arc());
    }

    if let Some(parent) = std::path::Path::new(&config.cache.db_path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let store_config = SledStoreConfig {
        db_path: config.cache.db_path.clone(),
        max_size_bytes: config.cache.max_size_bytes,
        retention: config.cache.retention(),
    };
    let store = SledArtifactStore::new(&store_config).context("Failed to open artifact store")?;

    Ok(store.arc())
}

fn build_collaborators(config: &AppConfig) -> anyhow::Result<PodcastCollaborators> {
    let mut script_config = OpenAiScriptClientConfig::new(&config.script.endpoint, &config.script.api_key)
        .with_timeout(config.script.timeout_secs);
    script_config.deployment = config.script.deployment.clone();
    script_config.api_version = config.script.api_version.clone();

    let mut speech_config =
        AzureSpeechClientConfig::new(&config.speech.region, &config.speech.subscription_key);
    speech_config.output_format = config.speech.output_format.clone();
    speech_config.timeout_secs = config.speech.timeout_secs;
    if let Some(endpoint) = &config.speech.endpoint {
        speech_config = speech_config.with_endpoint(endpoint);
    }

    let mut image_config = FluxImageClientConfig::new(&config.image.endpoint, &config.image.api_key);
    image_config.size = config.image.size.clone();
    image_config.timeout_secs = config.image.timeout_secs;

    Ok(PodcastCollaborators {
        script: Arc::new(OpenAiScriptClient::new(script_config)?),
        speech: Arc::new(AzureSpeechClient::new(speech_config)?),
        image: Arc::new(FluxImageClient::new(image_config)?),
    })
}
