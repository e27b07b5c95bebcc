//! Mixing Context - 语音与背景音乐的离线混音

mod buffer;
mod engine;
mod envelope;
mod errors;

pub use buffer::AudioBuffer;
pub use engine::{render_mix, MixConfig, MixPlan, OUTPUT_CHANNELS};
pub use envelope::{ControlPoint, GainEnvelope, RampKind};
pub use errors::MixError;
