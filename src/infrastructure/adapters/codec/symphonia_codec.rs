//! Symphonia Codec - 基于 symphonia 的音频编解码
//!
//! 支持：
//! - MP3 / WAV 解码（语音合成结果、背景音乐）
//! - 16-bit PCM WAV 编码（混音成品）
//! - WAV 头解析

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioCodecPort, CodecError, WavInfo};
use crate::domain::mixing::AudioBuffer;

/// 标准 PCM WAV 头长度
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;

/// Symphonia 编解码器
#[derive(Debug, Clone, Default)]
pub struct SymphoniaCodec;

impl SymphoniaCodec {
    pub fn new() -> Self {
        Self
    }
}

/// 浮点采样 → i16
///
/// 先钳位到 [-1, 1]，负数乘 32768，非负数乘 32767，向零截断
pub fn sample_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

/// 任一数据包解码失败都视为整个流损坏，否则会得到悄悄缺了片段的音频
fn check_packets(packets: usize, failed_packets: usize, samples: usize) -> Result<(), CodecError> {
    if failed_packets > 0 {
        return Err(CodecError::DecodingError(format!(
            "{} of {} packets failed to decode",
            failed_packets, packets
        )));
    }
    if packets > 0 && samples == 0 {
        return Err(CodecError::DecodingError(format!(
            "{} packets produced no samples",
            packets
        )));
    }
    Ok(())
}

impl AudioCodecPort for SymphoniaCodec {
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer, CodecError> {
        let cursor = Cursor::new(bytes.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CodecError::UnsupportedFormat(format!("Probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| CodecError::DecodingError("No audio track found".to_string()))?;

        let mut sample_rate = track.codec_params.sample_rate;
        let mut channel_count = track.codec_params.channels.map(|c| c.count());

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CodecError::DecodingError(format!("Decoder creation failed: {}", e)))?;

        let track_id = track.id;
        let mut samples: Vec<f32> = Vec::new();
        let mut packets = 0usize;
        let mut failed_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(CodecError::DecodingError(format!("Packet read error: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            packets += 1;
            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!(error = %e, packet = packets, "Decode error (skipping packet)");
                    failed_packets += 1;
                    continue;
                }
                Err(e) => return Err(CodecError::DecodingError(e.to_string())),
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);
            channel_count.get_or_insert(spec.channels.count());

            let num_frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            let actual_samples = num_frames * spec.channels.count();
            samples.extend(&sample_buf.samples()[..actual_samples]);
        }

        check_packets(packets, failed_packets, samples.len())?;

        let sample_rate =
            sample_rate.ok_or_else(|| CodecError::DecodingError("Unknown sample rate".to_string()))?;
        let channel_count = channel_count
            .ok_or_else(|| CodecError::DecodingError("Unknown channel count".to_string()))?;

        tracing::debug!(
            sample_rate = sample_rate,
            channels = channel_count,
            frames = samples.len() / channel_count.max(1),
            "Audio decoded"
        );

        AudioBuffer::from_interleaved(&samples, channel_count, sample_rate)
            .map_err(|e| CodecError::DecodingError(e.to_string()))
    }

    fn encode_wav(&self, buffer: &AudioBuffer) -> Result<Vec<u8>, CodecError> {
        let num_channels = u16::try_from(buffer.channel_count())
            .map_err(|_| CodecError::EncodingError("too many channels".to_string()))?;
        let sample_rate = buffer.sample_rate();
        let block_align = num_channels * (BITS_PER_SAMPLE / 8);
        let byte_rate = sample_rate * block_align as u32;

        let data_size = buffer.frames() * block_align as usize;
        let data_size = u32::try_from(data_size)
            .ok()
            .filter(|size| size.checked_add(36).is_some())
            .ok_or_else(|| CodecError::EncodingError("audio too long for WAV".to_string()))?;

        let mut wav = Vec::with_capacity(WAV_HEADER_LEN + data_size as usize);

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_size).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        wav.extend_from_slice(&num_channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_size.to_le_bytes());

        for frame in 0..buffer.frames() {
            for channel in buffer.channels() {
                wav.extend_from_slice(&sample_to_i16(channel[frame]).to_le_bytes());
            }
        }

        Ok(wav)
    }

    fn probe_wav(&self, data: &[u8]) -> Result<WavInfo, CodecError> {
        if data.len() < WAV_HEADER_LEN {
            return Err(CodecError::InvalidHeader("WAV data too short".to_string()));
        }
        if &data[0..4] != b"RIFF" {
            return Err(CodecError::InvalidHeader("missing RIFF header".to_string()));
        }
        if &data[8..12] != b"WAVE" {
            return Err(CodecError::InvalidHeader("missing WAVE identifier".to_string()));
        }

        let read_u16 = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]);
        let read_u32 =
            |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

        // 遍历 chunk 查找 fmt 和 data
        let mut pos = 12;
        let mut fmt: Option<(u16, u32, u16)> = None;
        let mut data_size: Option<u32> = None;

        while pos + 8 <= data.len() {
            let chunk_id = &data[pos..pos + 4];
            let chunk_size = read_u32(pos + 4);

            match chunk_id {
                b"fmt " => {
                    if chunk_size < 16 || pos + 8 + 16 > data.len() {
                        return Err(CodecError::InvalidHeader("invalid fmt chunk".to_string()));
                    }
                    let body = pos + 8;
                    fmt = Some((read_u16(body + 2), read_u32(body + 4), read_u16(body + 14)));
                }
                b"data" => {
                    data_size = Some(chunk_size);
                    break;
                }
                _ => {}
            }

            pos += 8 + chunk_size as usize;
            // 对齐到偶数字节
            if chunk_size % 2 != 0 {
                pos += 1;
            }
        }

        let (channels, sample_rate, bits_per_sample) =
            fmt.ok_or_else(|| CodecError::InvalidHeader("missing fmt chunk".to_string()))?;
        let data_size =
            data_size.ok_or_else(|| CodecError::InvalidHeader("missing data chunk".to_string()))?;

        Ok(WavInfo {
            channels,
            sample_rate,
            bits_per_sample,
            data_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_i16_samples(wav: &[u8]) -> Vec<i16> {
        wav[WAV_HEADER_LEN..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn test_header_layout() {
        let codec = SymphoniaCodec::new();
        let buffer = AudioBuffer::silent(2, 10, 44100).unwrap();
        let wav = codec.encode_wav(&buffer).unwrap();

        assert_eq!(wav.len(), WAV_HEADER_LEN + 40);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 36 + 40);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        // byte rate, block align
        assert_eq!(u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]), 44100 * 4);
        assert_eq!(u16::from_le_bytes([wav[32], wav[33]]), 4);
        assert_eq!(&wav[36..40], b"data");
        assert!(wav[WAV_HEADER_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_probe_roundtrip() {
        let codec = SymphoniaCodec::new();
        let buffer = AudioBuffer::silent(2, 44100, 44100).unwrap();
        let wav = codec.encode_wav(&buffer).unwrap();

        let info = codec.probe_wav(&wav).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.data_size, 44100 * 4);
        assert_eq!(info.duration_ms(), 1000);
    }

    #[test]
    fn test_asymmetric_scaling_and_clamping() {
        let codec = SymphoniaCodec::new();
        let buffer =
            AudioBuffer::new(8000, vec![vec![-1.0, 1.0, 0.5, -0.5, 2.0, -2.0, 0.0]]).unwrap();
        let wav = codec.encode_wav(&buffer).unwrap();

        assert_eq!(
            read_i16_samples(&wav),
            vec![-32768, 32767, 16383, -16384, 32767, -32768, 0]
        );
    }

    #[test]
    fn test_interleaves_channels() {
        let codec = SymphoniaCodec::new();
        let buffer = AudioBuffer::new(8000, vec![vec![1.0, 0.0], vec![-1.0, 0.0]]).unwrap();
        let wav = codec.encode_wav(&buffer).unwrap();
        assert_eq!(read_i16_samples(&wav), vec![32767, -32768, 0, 0]);
    }

    #[test]
    fn test_decode_encoded_wav() {
        let codec = SymphoniaCodec::new();
        let buffer = AudioBuffer::new(16000, vec![vec![0.5; 1600], vec![-0.25; 1600]]).unwrap();
        let wav = codec.encode_wav(&buffer).unwrap();

        let decoded = codec.decode(&wav).unwrap();
        assert_eq!(decoded.sample_rate(), 16000);
        assert_eq!(decoded.channel_count(), 2);
        assert_eq!(decoded.frames(), 1600);
        assert!((decoded.channel(0)[100] - 0.5).abs() < 1e-3);
        assert!((decoded.channel(1)[100] + 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_rejects_garbage() {
        let codec = SymphoniaCodec::new();
        assert!(codec.decode(b"definitely not audio").is_err());
        assert!(codec.probe_wav(&[0u8; 10]).is_err());
        assert!(codec.probe_wav(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_skipped_packets_fail_decode() {
        assert!(check_packets(0, 0, 0).is_ok());
        assert!(check_packets(12, 0, 4800).is_ok());

        let err = check_packets(12, 3, 3600).unwrap_err();
        assert_eq!(
            err,
            CodecError::DecodingError("3 of 12 packets failed to decode".to_string())
        );
        assert!(matches!(check_packets(4, 0, 0), Err(CodecError::DecodingError(_))));
    }
}
