//! 多声道浮点采样缓冲

use super::errors::MixError;

/// 平面布局的 PCM 缓冲（每个声道一个 Vec）
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, MixError> {
        if sample_rate == 0 {
            return Err(MixError::InvalidBuffer("sample rate cannot be 0".to_string()));
        }
        if channels.is_empty() {
            return Err(MixError::InvalidBuffer("buffer has no channels".to_string()));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(MixError::InvalidBuffer(
                "channels have different lengths".to_string(),
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// 从交错采样构建
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, MixError> {
        if channel_count == 0 {
            return Err(MixError::InvalidBuffer("buffer has no channels".to_string()));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &sample) in frame.iter().enumerate() {
                channels[ch].push(sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn silent(channel_count: usize, frames: usize, sample_rate: u32) -> Result<Self, MixError> {
        Self::new(sample_rate, vec![vec![0.0; frames]; channel_count])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// 交错输出：每帧按声道顺序排列
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames() * self.channel_count());
        for frame in 0..self.frames() {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    /// 线性插值重采样
    pub fn resample(&self, to_rate: u32) -> AudioBuffer {
        if to_rate == self.sample_rate || to_rate == 0 {
            return self.clone();
        }

        let ratio = to_rate as f64 / self.sample_rate as f64;
        let frame_count = self.frames();
        let new_frame_count = (frame_count as f64 * ratio).round() as usize;

        let channels = self
            .channels
            .iter()
            .map(|samples| {
                if frame_count == 0 {
                    return Vec::new();
                }
                (0..new_frame_count)
                    .map(|i| {
                        let src_pos = i as f64 / ratio;
                        let idx0 = (src_pos as usize).min(frame_count - 1);
                        let idx1 = (idx0 + 1).min(frame_count - 1);
                        let frac = (src_pos - idx0 as f64) as f32;
                        let s0 = samples[idx0];
                        let s1 = samples[idx1];
                        s0 + (s1 - s0) * frac
                    })
                    .collect()
            })
            .collect();

        AudioBuffer {
            sample_rate: to_rate,
            channels,
        }
    }

    /// 映射到立体声：单声道复制到左右，多于两声道取前两个
    pub fn to_stereo(&self) -> AudioBuffer {
        let channels = match self.channels.len() {
            1 => vec![self.channels[0].clone(), self.channels[0].clone()],
            _ => self.channels[..2].to_vec(),
        };
        AudioBuffer {
            sample_rate: self.sample_rate,
            channels,
        }
    }
}
