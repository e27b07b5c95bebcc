//! Codec Adapter - 音频编解码

mod symphonia_codec;

pub use symphonia_codec::{sample_to_i16, SymphoniaCodec, WAV_HEADER_LEN};
