//! Markup Context - 对话脚本 → SSML

mod compiler;
mod dialogue;

pub use compiler::{
    break_tag, compile_script, escape_xml, MarkupCompiler, MarkupDocument, MarkupUtterance,
    VoiceMap, EMPTY_LINE_PAUSE_MS, MEMO_CAPACITY, UTTERANCE_GAP_MS,
};
pub use dialogue::{parse_script, DialogueLine, EmotionTag, ProsodyAdjustment, ProsodySetting};
