//! SSML 编译器
//!
//! 对话脚本 → `<speak>` 文档：
//! - 每行一个 `<voice>`，携带主持人音色和韵律
//! - 纯情绪/纯标签行输出 500ms 停顿
//! - 句末标点和省略号后插入停顿
//!
//! 编译永不失败，最坏情况输出空文档

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::dialogue::{parse_script, ProsodySetting};
use crate::domain::podcast::Speaker;

/// 空行停顿
pub const EMPTY_LINE_PAUSE_MS: u32 = 500;
/// 每段台词之后的停顿
pub const UTTERANCE_GAP_MS: u32 = 220;
/// `. ` 之后
pub const PERIOD_PAUSE_MS: u32 = 180;
/// `! ` 之后
pub const EXCLAMATION_PAUSE_MS: u32 = 220;
/// `? ` 之后
pub const QUESTION_PAUSE_MS: u32 = 200;
/// 省略号之后
pub const ELLIPSIS_PAUSE_MS: u32 = 420;

/// 备忘表容量
pub const MEMO_CAPACITY: usize = 50;
/// 指纹取前 N 个字符
const FINGERPRINT_PREFIX_CHARS: usize = 50;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
const SPEAK_OPEN: &str = r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" xmlns:mstts="https://www.w3.org/2001/mstts" xml:lang="en-US">"#;
const SPEAK_CLOSE: &str = "</speak>";

/// 主持人 → 音色
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceMap {
    pub host1: String,
    pub host2: String,
}

impl Default for VoiceMap {
    fn default() -> Self {
        Self {
            host1: "en-US-DerekMultilingualNeural".to_string(),
            host2: "en-US-NancyMultilingualNeural".to_string(),
        }
    }
}

impl VoiceMap {
    pub fn voice_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Host1 => &self.host1,
            Speaker::Host2 => &self.host2,
        }
    }
}

/// 一段 SSML 输出
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupUtterance {
    Voice {
        voice_id: String,
        prosody: ProsodySetting,
        /// 已转义的文本，含内联 `<break/>`
        body: String,
    },
    Pause {
        duration_ms: u32,
    },
}

/// 编译结果，构建后不可变
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkupDocument {
    utterances: Vec<MarkupUtterance>,
}

impl MarkupDocument {
    pub fn utterances(&self) -> &[MarkupUtterance] {
        &self.utterances
    }

    pub fn voice_count(&self) -> usize {
        self.utterances
            .iter()
            .filter(|u| matches!(u, MarkupUtterance::Voice { .. }))
            .count()
    }

    pub fn pause_count(&self) -> usize {
        self.utterances
            .iter()
            .filter(|u| matches!(u, MarkupUtterance::Pause { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    /// 序列化为 SSML 文本
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(XML_DECLARATION);
        out.push('\n');
        out.push_str(SPEAK_OPEN);
        out.push('\n');

        for utterance in &self.utterances {
            match utterance {
                MarkupUtterance::Voice {
                    voice_id,
                    prosody,
                    body,
                } => {
                    out.push_str(&format!(
                        r#"<voice name="{}"><prosody rate="{}" pitch="{}">{}</prosody>{}</voice>"#,
                        escape_xml(voice_id),
                        prosody.rate_attr(),
                        prosody.pitch_attr(),
                        body,
                        break_tag(UTTERANCE_GAP_MS),
                    ));
                }
                MarkupUtterance::Pause { duration_ms } => {
                    out.push_str(&break_tag(*duration_ms));
                }
            }
            out.push('\n');
        }

        out.push_str(SPEAK_CLOSE);
        out
    }
}

/// `<break time="Nms"/>`
pub fn break_tag(duration_ms: u32) -> String {
    format!(r#"<break time="{}ms"/>"#, duration_ms)
}

/// 转义 XML 保留字符
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// 在已转义文本中插入停顿
///
/// 转义序列不含 `.` `!` `?`，因此插入不会破坏实体
fn insert_pauses(escaped: &str) -> String {
    let chars: Vec<char> = escaped.chars().collect();
    let mut out = String::with_capacity(escaped.len() + 32);
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '.' && chars.get(i + 1) == Some(&'.') && chars.get(i + 2) == Some(&'.') {
            out.push_str("...");
            out.push_str(&break_tag(ELLIPSIS_PAUSE_MS));
            i += 3;
            continue;
        }
        if ch == '\u{2026}' {
            out.push(ch);
            out.push_str(&break_tag(ELLIPSIS_PAUSE_MS));
            i += 1;
            continue;
        }

        out.push(ch);
        if chars.get(i + 1) == Some(&' ') {
            match ch {
                '.' => out.push_str(&break_tag(PERIOD_PAUSE_MS)),
                '!' => out.push_str(&break_tag(EXCLAMATION_PAUSE_MS)),
                '?' => out.push_str(&break_tag(QUESTION_PAUSE_MS)),
                _ => {}
            }
        }
        i += 1;
    }

    out
}

/// 编译脚本（无备忘）
pub fn compile_script(script: &str, voices: &VoiceMap) -> MarkupDocument {
    let utterances = parse_script(script)
        .into_iter()
        .map(|line| {
            let spoken = line.spoken_text();
            if spoken.is_empty() {
                return MarkupUtterance::Pause {
                    duration_ms: EMPTY_LINE_PAUSE_MS,
                };
            }
            MarkupUtterance::Voice {
                voice_id: voices.voice_for(line.speaker).to_string(),
                prosody: line.prosody(),
                body: insert_pauses(&escape_xml(&spoken)),
            }
        })
        .collect();

    MarkupDocument { utterances }
}

type Fingerprint = (usize, String);

/// FIFO 备忘表，命中时还会比对完整原文
#[derive(Debug)]
struct MemoTable {
    entries: HashMap<Fingerprint, (String, MarkupDocument)>,
    order: VecDeque<Fingerprint>,
    capacity: usize,
}

impl MemoTable {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn fingerprint(script: &str) -> Fingerprint {
        (
            script.len(),
            script.chars().take(FINGERPRINT_PREFIX_CHARS).collect(),
        )
    }

    fn get(&self, script: &str) -> Option<MarkupDocument> {
        self.entries
            .get(&Self::fingerprint(script))
            .filter(|(source, _)| source == script)
            .map(|(_, doc)| doc.clone())
    }

    fn insert(&mut self, script: &str, document: MarkupDocument) {
        let key = Self::fingerprint(script);
        if !self.entries.contains_key(&key) {
            if self.entries.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
            self.order.push_back(key.clone());
        }
        self.entries.insert(key, (script.to_string(), document));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// 带备忘的 SSML 编译器
pub struct MarkupCompiler {
    voices: VoiceMap,
    memo: Mutex<MemoTable>,
}

impl MarkupCompiler {
    pub fn new(voices: VoiceMap) -> Self {
        Self::with_capacity(voices, MEMO_CAPACITY)
    }

    pub fn with_capacity(voices: VoiceMap, capacity: usize) -> Self {
        Self {
            voices,
            memo: Mutex::new(MemoTable::new(capacity.max(1))),
        }
    }

    pub fn voices(&self) -> &VoiceMap {
        &self.voices
    }

    pub fn compile(&self, script: &str) -> MarkupDocument {
        if let Ok(memo) = self.memo.lock() {
            if let Some(document) = memo.get(script) {
                tracing::trace!(script_len = script.len(), "Markup memo hit");
                return document;
            }
        }

        let document = compile_script(script, &self.voices);

        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(script, document.clone());
        }

        tracing::debug!(
            script_len = script.len(),
            voices = document.voice_count(),
            pauses = document.pause_count(),
            "Script compiled to SSML"
        );
        document
    }

    pub fn memo_len(&self) -> usize {
        self.memo.lock().map(|m| m.len()).unwrap_or(0)
    }
}

impl Default for MarkupCompiler {
    fn default() -> Self {
        Self::new(VoiceMap::default())
    }
}
