//! Audio Codec Port - 音频编解码抽象
//!
//! 解码压缩音频（MP3/WAV）为浮点缓冲，编码混音结果为 16-bit PCM WAV。
//! CPU 密集操作，调用方负责放到阻塞线程池中执行

use serde::Serialize;
use thiserror::Error;

use crate::domain::mixing::AudioBuffer;

/// 编解码错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid WAV header: {0}")]
    InvalidHeader(String),
}

/// WAV 头信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// data 块字节数
    pub data_size: u32,
}

impl WavInfo {
    pub fn frames(&self) -> u64 {
        let block_align = self.channels as u64 * (self.bits_per_sample as u64 / 8);
        if block_align == 0 {
            return 0;
        }
        self.data_size as u64 / block_align
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames() * 1000 / self.sample_rate as u64
    }
}

/// Audio Codec Port
pub trait AudioCodecPort: Send + Sync {
    /// 解码任意支持的容器为浮点缓冲
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer, CodecError>;

    /// 编码为 44 字节头的 16-bit PCM WAV
    fn encode_wav(&self, buffer: &AudioBuffer) -> Result<Vec<u8>, CodecError>;

    /// 读取 WAV 头
    fn probe_wav(&self, bytes: &[u8]) -> Result<WavInfo, CodecError>;
}
