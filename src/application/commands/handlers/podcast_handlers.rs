//! Podcast Command Handlers
//!
//! 流水线：缓存检查 → 脚本（与封面图并发）→ SSML → 语音合成 → 解码混音 → WAV → 缓存

use std::sync::Arc;
use uuid::Uuid;

use crate::application::coalescer::RequestCoalescer;
use crate::application::commands::podcast_commands::*;
use crate::application::error::{ApplicationError, Stage};
use crate::application::ports::{
    AudioCodecPort, CollaboratorError, ImageGeneratorPort, ScriptGeneratorPort,
    SpeechSynthesizerPort,
};
use crate::domain::markup::MarkupCompiler;
use crate::domain::mixing::{render_mix, AudioBuffer, MixConfig};
use crate::domain::podcast::{CacheKey, CachePurpose, DurationMinutes, Topic};

/// 封面图生成失败时的占位图
pub const PLACEHOLDER_COVER_ART: &str = concat!(
    "data:image/svg+xml,",
    "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"200\" height=\"200\">",
    "<rect fill=\"%231db954\" width=\"200\" height=\"200\"/>",
    "<text x=\"50%\" y=\"50%\" fill=\"white\" font-size=\"20\" text-anchor=\"middle\" dy=\".3em\">🎙️</text>",
    "</svg>"
);

/// 流水线依赖的外部服务
#[derive(Clone)]
pub struct PodcastCollaborators {
    pub script: Arc<dyn ScriptGeneratorPort>,
    pub speech: Arc<dyn SpeechSynthesizerPort>,
    pub image: Arc<dyn ImageGeneratorPort>,
}

/// GeneratePodcast Handler - 生成节目
pub struct GeneratePodcastHandler {
    coalescer: RequestCoalescer,
    collaborators: PodcastCollaborators,
    codec: Arc<dyn AudioCodecPort>,
    compiler: Arc<MarkupCompiler>,
    /// 背景音乐（启动时已解码）
    music: Arc<AudioBuffer>,
    mix_config: MixConfig,
    key_prefix: String,
}

impl GeneratePodcastHandler {
    pub fn new(
        coalescer: RequestCoalescer,
        collaborators: PodcastCollaborators,
        codec: Arc<dyn AudioCodecPort>,
        compiler: Arc<MarkupCompiler>,
        music: Arc<AudioBuffer>,
        mix_config: MixConfig,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            coalescer,
            collaborators,
            codec,
            compiler,
            music,
            mix_config,
            key_prefix: key_prefix.into(),
        }
    }

    pub async fn handle(
        &self,
        cmd: GeneratePodcastCommand,
    ) -> Result<GeneratePodcastResponse, ApplicationError> {
        let topic = Topic::new(&cmd.topic)?;
        let duration = DurationMinutes::new(cmd.duration_minutes)?;
        let request_id = Uuid::new_v4();

        tracing::info!(
            request_id = %request_id,
            topic = %topic,
            duration_minutes = %duration,
            "Generating podcast"
        );

        let mixed_key = CacheKey::new(&self.key_prefix, &topic, CachePurpose::Mixed(duration));

        if let Some(wav) = self.coalescer.fetch_cached(mixed_key.as_str()).await {
            let cover_art = self.cover_art(&topic).await;
            tracing::info!(request_id = %request_id, key = %mixed_key, "Serving cached podcast");
            return self.respond(mixed_key, cover_art, true, wav);
        }

        let (script, cover_art) = tokio::join!(self.script(&topic, duration), self.cover_art(&topic));
        let script = script?;

        tracing::info!(
            request_id = %request_id,
            script_chars = script.len(),
            "Script ready"
        );

        let ssml = self.compile_markup(&script)?;
        let wav = self.mixed_audio(&mixed_key, &topic, duration, ssml).await?;

        tracing::info!(
            request_id = %request_id,
            key = %mixed_key,
            byte_len = wav.len(),
            "Podcast generated"
        );

        self.respond(mixed_key, cover_art, false, wav)
    }

    fn respond(
        &self,
        key: CacheKey,
        cover_art: String,
        cached: bool,
        wav: Vec<u8>,
    ) -> Result<GeneratePodcastResponse, ApplicationError> {
        let info = self.codec.probe_wav(&wav)?;
        Ok(GeneratePodcastResponse {
            audio_key: key.to_string(),
            cover_art,
            cached,
            duration_ms: info.duration_ms(),
            byte_len: wav.len(),
        })
    }

    async fn script(&self, topic: &Topic, duration: DurationMinutes) -> Result<String, ApplicationError> {
        let key = CacheKey::new(&self.key_prefix, topic, CachePurpose::Script(duration));
        let generator = self.collaborators.script.clone();
        let topic = topic.clone();

        let bytes = self
            .coalescer
            .fetch_or_compute(key.as_str(), move || async move {
                let script = generator
                    .generate_script(&topic, duration)
                    .await
                    .map_err(|e| ApplicationError::collaborator(Stage::Script, &e))?;
                if script.trim().is_empty() {
                    let err = CollaboratorError::InvalidResponse("empty script".to_string());
                    return Err(ApplicationError::collaborator(Stage::Script, &err));
                }
                Ok(script.into_bytes())
            })
            .await?;

        String::from_utf8(bytes).map_err(|e| ApplicationError::internal(e.to_string()))
    }

    /// 封面图失败不影响节目生成，占位图不写缓存
    async fn cover_art(&self, topic: &Topic) -> String {
        let key = CacheKey::new(&self.key_prefix, topic, CachePurpose::Image);
        let generator = self.collaborators.image.clone();
        let owned_topic = topic.clone();

        let result = self
            .coalescer
            .fetch_or_compute(key.as_str(), move || async move {
                generator
                    .generate_image(&owned_topic)
                    .await
                    .map(String::into_bytes)
                    .map_err(|e| ApplicationError::collaborator(Stage::Image, &e))
            })
            .await
            .and_then(|bytes| {
                String::from_utf8(bytes).map_err(|e| ApplicationError::internal(e.to_string()))
            });

        match result {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Cover art unavailable, using placeholder");
                PLACEHOLDER_COVER_ART.to_string()
            }
        }
    }

    fn compile_markup(&self, script: &str) -> Result<String, ApplicationError> {
        let document = self.compiler.compile(script);
        if document.is_empty() {
            let err = CollaboratorError::InvalidResponse("script contains no dialogue".to_string());
            return Err(ApplicationError::collaborator(Stage::Script, &err));
        }
        tracing::debug!(
            voices = document.voice_count(),
            pauses = document.pause_count(),
            "Markup compiled"
        );
        Ok(document.render())
    }

    async fn mixed_audio(
        &self,
        mixed_key: &CacheKey,
        topic: &Topic,
        duration: DurationMinutes,
        ssml: String,
    ) -> Result<Vec<u8>, ApplicationError> {
        let audio_key = CacheKey::new(&self.key_prefix, topic, CachePurpose::Audio(duration));
        let coalescer = self.coalescer.clone();
        let synthesizer = self.collaborators.speech.clone();
        let codec = self.codec.clone();
        let speech_codec = self.codec.clone();
        let music = self.music.clone();
        let config = self.mix_config.clone();

        self.coalescer
            .fetch_or_compute(mixed_key.as_str(), move || async move {
                // 语音先解码校验再入缓存，坏数据不会被缓存，下次请求会重新合成
                let speech = coalescer
                    .fetch_or_compute(audio_key.as_str(), move || async move {
                        let speech = synthesizer
                            .synthesize(&ssml)
                            .await
                            .map_err(|e| ApplicationError::collaborator(Stage::Speech, &e))?;
                        tokio::task::spawn_blocking(move || {
                            decode_speech(speech_codec.as_ref(), &speech).map(|_| speech)
                        })
                        .await
                        .map_err(|e| ApplicationError::internal(format!("decode task failed: {}", e)))?
                    })
                    .await?;

                tokio::task::spawn_blocking(move || {
                    render_podcast(codec.as_ref(), &speech, &music, &config)
                })
                .await
                .map_err(|e| ApplicationError::internal(format!("render task failed: {}", e)))?
            })
            .await
    }
}

fn decode_speech(codec: &dyn AudioCodecPort, speech: &[u8]) -> Result<AudioBuffer, ApplicationError> {
    codec
        .decode(speech)
        .map_err(|e| ApplicationError::decode(Stage::Speech, e.to_string()))
}

/// 解码背景音乐，启动时调用一次
pub fn decode_music(codec: &dyn AudioCodecPort, music: &[u8]) -> Result<AudioBuffer, ApplicationError> {
    codec
        .decode(music)
        .map_err(|e| ApplicationError::decode(Stage::Mixing, e.to_string()))
}

/// 解码语音，混音并编码为 WAV（阻塞）
pub fn render_podcast(
    codec: &dyn AudioCodecPort,
    speech: &[u8],
    music: &AudioBuffer,
    config: &MixConfig,
) -> Result<Vec<u8>, ApplicationError> {
    let speech = decode_speech(codec, speech)?;
    let mixed = render_mix(&speech, music, config)?;
    Ok(codec.encode_wav(&mixed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        ArtifactStorePort, CodecError, StoreError, StoreStats, WavInfo,
    };
    use crate::infrastructure::memory::InMemoryArtifactStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        entries: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl ArtifactStorePort for FakeStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &str, payload: Vec<u8>) -> Result<(), StoreError> {
            self.entries.lock().unwrap().insert(key.to_string(), payload);
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }

        async fn purge_expired(&self) -> Result<usize, StoreError> {
            Ok(0)
        }

        async fn stats(&self) -> StoreStats {
            StoreStats::default()
        }
    }

    struct FakeScript {
        calls: AtomicUsize,
        script: String,
    }

    #[async_trait]
    impl ScriptGeneratorPort for FakeScript {
        async fn generate_script(
            &self,
            _topic: &Topic,
            _duration: DurationMinutes,
        ) -> Result<String, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.script.clone())
        }
    }

    struct FakeSpeech {
        fail: bool,
        /// 前 N 次返回无法解码的数据
        garbage_replies: usize,
        calls: AtomicUsize,
        last_ssml: Mutex<Option<String>>,
    }

    impl FakeSpeech {
        fn new(fail: bool, garbage_replies: usize) -> Self {
            Self {
                fail,
                garbage_replies,
                calls: AtomicUsize::new(0),
                last_ssml: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizerPort for FakeSpeech {
        async fn synthesize(&self, ssml: &str) -> Result<Vec<u8>, CollaboratorError> {
            *self.last_ssml.lock().unwrap() = Some(ssml.to_string());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.garbage_replies {
                return Ok(b"<html>gateway error</html>".to_vec());
            }
            if self.fail {
                return Err(CollaboratorError::HttpStatus {
                    status: 401,
                    body: "bad key".to_string(),
                });
            }
            Ok(b"speech".to_vec())
        }
    }

    struct FakeImage;

    #[async_trait]
    impl ImageGeneratorPort for FakeImage {
        async fn generate_image(&self, _topic: &Topic) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::NetworkError("offline".to_string()))
        }
    }

    /// 把输入字节当作 1kHz 单声道常量信号；编码只写帧数
    struct FakeCodec;

    impl AudioCodecPort for FakeCodec {
        fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer, CodecError> {
            match bytes {
                b"speech" => Ok(AudioBuffer::new(1000, vec![vec![0.25; 2000]]).unwrap()),
                b"music" => Ok(AudioBuffer::new(1000, vec![vec![0.5; 1000]]).unwrap()),
                _ => Err(CodecError::DecodingError("unknown stream".to_string())),
            }
        }

        fn encode_wav(&self, buffer: &AudioBuffer) -> Result<Vec<u8>, CodecError> {
            Ok((buffer.frames() as u32).to_le_bytes().to_vec())
        }

        fn probe_wav(&self, bytes: &[u8]) -> Result<WavInfo, CodecError> {
            let frames = u32::from_le_bytes(
                bytes
                    .try_into()
                    .map_err(|_| CodecError::InvalidHeader("short".to_string()))?,
            );
            Ok(WavInfo {
                channels: 2,
                sample_rate: 1000,
                bits_per_sample: 16,
                data_size: frames * 4,
            })
        }
    }

    fn music() -> AudioBuffer {
        FakeCodec.decode(b"music").unwrap()
    }

    fn handler(speech: FakeSpeech) -> (GeneratePodcastHandler, Arc<FakeScript>, Arc<FakeSpeech>) {
        handler_with_store(speech, Arc::new(FakeStore::default()))
    }

    fn handler_with_store(
        speech: FakeSpeech,
        store: Arc<dyn ArtifactStorePort>,
    ) -> (GeneratePodcastHandler, Arc<FakeScript>, Arc<FakeSpeech>) {
        let script = Arc::new(FakeScript {
            calls: AtomicUsize::new(0),
            script: "Host 1: Hello & welcome!\nHost 2: [laughs] Thanks.".to_string(),
        });
        let speech = Arc::new(speech);
        let collaborators = PodcastCollaborators {
            script: script.clone(),
            speech: speech.clone(),
            image: Arc::new(FakeImage),
        };
        let config = MixConfig {
            sample_rate: 1000,
            ..MixConfig::default()
        };
        let handler = GeneratePodcastHandler::new(
            RequestCoalescer::new(store),
            collaborators,
            Arc::new(FakeCodec),
            Arc::new(MarkupCompiler::default()),
            Arc::new(music()),
            config,
            "test_",
        );
        (handler, script, speech)
    }

    fn command(topic: &str) -> GeneratePodcastCommand {
        GeneratePodcastCommand {
            topic: topic.to_string(),
            duration_minutes: 1.0,
        }
    }

    #[tokio::test]
    async fn test_generates_and_then_serves_from_cache() {
        let (handler, script, speech) = handler(FakeSpeech::new(false, 0));

        let first = handler.handle(command("Rust")).await.unwrap();
        assert!(!first.cached);
        // 3s + 2s + 8s
        assert_eq!(first.duration_ms, 13_000);
        assert_eq!(first.cover_art, PLACEHOLDER_COVER_ART);
        assert!(first.audio_key.starts_with("test_"));
        assert!(first.audio_key.ends_with("_mixed_1"));

        let ssml = speech.last_ssml.lock().unwrap().clone().unwrap();
        assert!(ssml.contains("Hello &amp; welcome!"));

        let second = handler.handle(command("  rust ")).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.audio_key, first.audio_key);
        assert_eq!(script.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_speech_failure_reports_stage() {
        let (handler, _, _) = handler(FakeSpeech::new(true, 0));
        let err = handler.handle(command("Rust")).await.unwrap_err();
        assert_eq!(
            err,
            ApplicationError::CollaboratorError {
                stage: Stage::Speech,
                status: 401,
                body: "bad key".to_string(),
            }
        );
    }

    #[test]
    fn test_music_decode_failure_is_mixing_stage() {
        let err = decode_music(&FakeCodec, b"garbage").unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::DecodeError {
                stage: Stage::Mixing,
                ..
            }
        ));
        assert_eq!(decode_music(&FakeCodec, b"music").unwrap().frames(), 1000);
    }

    #[tokio::test]
    async fn test_undecodable_speech_is_not_cached() {
        let store = InMemoryArtifactStore::new(chrono::Duration::days(7)).arc();
        let (handler, _, speech) = handler_with_store(FakeSpeech::new(false, 1), store.clone());

        let err = handler.handle(command("Rust")).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::DecodeError {
                stage: Stage::Speech,
                ..
            }
        ));
        let audio_key = CacheKey::new(
            "test_",
            &Topic::new("Rust").unwrap(),
            CachePurpose::Audio(DurationMinutes::default()),
        );
        assert_eq!(store.get(audio_key.as_str()).await.unwrap(), None);

        // 重试会重新调用语音合成
        let retry = handler.handle(command("Rust")).await.unwrap();
        assert!(!retry.cached);
        assert_eq!(retry.duration_ms, 13_000);
        assert_eq!(speech.calls.load(Ordering::SeqCst), 2);
        assert!(store.get(audio_key.as_str()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejects_invalid_input() {
        let (handler, script, _) = handler(FakeSpeech::new(false, 0));
        assert!(matches!(
            handler.handle(command("   ")).await,
            Err(ApplicationError::InputError(_))
        ));
        let bad_duration = GeneratePodcastCommand {
            topic: "Rust".to_string(),
            duration_minutes: -1.0,
        };
        assert!(matches!(
            handler.handle(bad_duration).await,
            Err(ApplicationError::InputError(_))
        ));
        assert_eq!(script.calls.load(Ordering::SeqCst), 0);
    }
}
