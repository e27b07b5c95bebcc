//! 离线混音
//!
//! 时间线（秒，T0 = 0）:
//! - [0, intro)            片段 A：循环播放音乐，0.8 保持，intro 前 2s 线性淡出到 0
//! - [intro, speechEnd)    语音，满增益
//! - [speechEnd, total)    片段 B：音乐从头开始不循环，2s 淡入到 0.8，结尾 2s 淡出
//!
//! 各轨道逐帧逐声道相加，不做限幅；越界在编码时钳位

use super::buffer::AudioBuffer;
use super::envelope::{ControlPoint, GainEnvelope};
use super::errors::MixError;

/// 输出声道数
pub const OUTPUT_CHANNELS: usize = 2;

/// 混音配置
#[derive(Debug, Clone, PartialEq)]
pub struct MixConfig {
    /// 片头音乐时长，语音在此刻开始
    pub intro_ms: u64,
    /// 音乐转为背景的淡出时长（目前包络只使用 transition_ms）
    pub fade_to_background_ms: u64,
    /// 片尾音乐时长
    pub outro_fade_ms: u64,
    /// 淡入淡出过渡时长
    pub transition_ms: u64,
    /// 音乐增益上限
    pub music_gain: f32,
    /// 渲染采样率
    pub sample_rate: u32,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            intro_ms: 3000,
            fade_to_background_ms: 2500,
            outro_fade_ms: 8000,
            transition_ms: 2000,
            music_gain: 0.8,
            sample_rate: 44100,
        }
    }
}

impl MixConfig {
    pub fn validate(&self) -> Result<(), MixError> {
        if self.sample_rate == 0 {
            return Err(MixError::InvalidConfig("sample rate cannot be 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.music_gain) {
            return Err(MixError::InvalidConfig(format!(
                "music gain out of range: {}",
                self.music_gain
            )));
        }
        Ok(())
    }

    fn ms_to_frames(&self, ms: u64) -> usize {
        (ms * self.sample_rate as u64 / 1000) as usize
    }
}

/// 一次混音的时间线
#[derive(Debug, Clone, PartialEq)]
pub struct MixPlan {
    pub sample_rate: u32,
    pub intro_frames: usize,
    pub speech_frames: usize,
    pub outro_frames: usize,
    /// 片段 A 包络
    pub intro_envelope: GainEnvelope,
    /// 片段 B 包络
    pub outro_envelope: GainEnvelope,
}

impl MixPlan {
    /// 按语音长度（帧，已是渲染采样率）生成时间线
    pub fn new(config: &MixConfig, speech_frames: usize) -> Result<Self, MixError> {
        config.validate()?;

        let rate = config.sample_rate as f64;
        let intro_frames = config.ms_to_frames(config.intro_ms);
        let outro_frames = config.ms_to_frames(config.outro_fade_ms);
        let transition = config.transition_ms as f64 / 1000.0;
        let gain = config.music_gain;

        let intro_secs = intro_frames as f64 / rate;
        let speech_end = (intro_frames + speech_frames) as f64 / rate;
        let total = (intro_frames + speech_frames + outro_frames) as f64 / rate;

        let intro_envelope = GainEnvelope::new(vec![
            ControlPoint::step(0.0, gain),
            ControlPoint::step((intro_secs - transition).max(0.0), gain),
            ControlPoint::linear(intro_secs, 0.0),
        ])?;

        // 片尾过短时过渡时长减半，保证控制点有序
        let outro_secs = total - speech_end;
        let outro_transition = transition.min(outro_secs / 2.0);
        let outro_envelope = GainEnvelope::new(vec![
            ControlPoint::step(speech_end, 0.0),
            ControlPoint::linear(speech_end + outro_transition, gain),
            ControlPoint::step(total - outro_transition, gain),
            ControlPoint::linear(total, 0.0),
        ])?;

        Ok(Self {
            sample_rate: config.sample_rate,
            intro_frames,
            speech_frames,
            outro_frames,
            intro_envelope,
            outro_envelope,
        })
    }

    pub fn speech_end_frame(&self) -> usize {
        self.intro_frames + self.speech_frames
    }

    pub fn total_frames(&self) -> usize {
        self.intro_frames + self.speech_frames + self.outro_frames
    }

    pub fn total_secs(&self) -> f64 {
        self.total_frames() as f64 / self.sample_rate as f64
    }

    fn time_of(&self, frame: usize) -> f64 {
        frame as f64 / self.sample_rate as f64
    }
}

/// 渲染混音结果（立体声，config.sample_rate）
///
/// 输入相同则输出逐位相同
pub fn render_mix(
    speech: &AudioBuffer,
    music: &AudioBuffer,
    config: &MixConfig,
) -> Result<AudioBuffer, MixError> {
    let speech = speech.resample(config.sample_rate).to_stereo();
    let music = music.resample(config.sample_rate).to_stereo();

    let plan = MixPlan::new(config, speech.frames())?;
    let total_frames = plan.total_frames();
    let music_frames = music.frames();
    let mut output = vec![vec![0.0f32; total_frames]; OUTPUT_CHANNELS];

    // 片段 A：循环
    if music_frames > 0 {
        for frame in 0..plan.intro_frames {
            let gain = plan.intro_envelope.gain_at(plan.time_of(frame));
            let src = frame % music_frames;
            for (ch, out) in output.iter_mut().enumerate() {
                out[frame] += music.channel(ch)[src] * gain;
            }
        }
    }

    // 语音：满增益
    for (ch, out) in output.iter_mut().enumerate() {
        let dst = &mut out[plan.intro_frames..plan.speech_end_frame()];
        for (o, s) in dst.iter_mut().zip(speech.channel(ch)) {
            *o += *s;
        }
    }

    // 片段 B：不循环，音乐结束后保持静音
    let outro_start = plan.speech_end_frame();
    let outro_len = plan.outro_frames.min(music_frames);
    for offset in 0..outro_len {
        let frame = outro_start + offset;
        let gain = plan.outro_envelope.gain_at(plan.time_of(frame));
        for (ch, out) in output.iter_mut().enumerate() {
            out[frame] += music.channel(ch)[offset] * gain;
        }
    }

    tracing::debug!(
        intro_frames = plan.intro_frames,
        speech_frames = plan.speech_frames,
        outro_frames = plan.outro_frames,
        total_secs = plan.total_secs(),
        "Mix rendered"
    );

    AudioBuffer::new(config.sample_rate, output)
}
