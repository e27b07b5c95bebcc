//! 对话行解析
//!
//! 一行脚本 = 可选的主持人标签 + 若干 `[emotion]` 标注 + 台词

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::podcast::Speaker;

/// `Host 1:` / `host2 :` 等标签，大小写不敏感
static SPEAKER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^host\s*([12])\s*:\s*").expect("valid speaker label regex"));

/// 方括号情绪标注（非贪婪）
static EMOTION_ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[.*?\]").expect("valid emotion annotation regex"));

/// 默认语速
pub const DEFAULT_RATE: f32 = 1.0;
/// 默认音高（百分比）
pub const DEFAULT_PITCH_PERCENT: i8 = -1;

/// 情绪标注
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmotionTag {
    Laugh,
    Sigh,
    Gasp,
    Excited,
    Whisper,
    Thoughtful,
    Warm,
    ClearsThroat,
    /// 未识别的标注：照样剥离，不影响韵律
    Other,
}

/// 单个标注对韵律的调整，`None` 表示不修改该参数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProsodyAdjustment {
    pub rate: Option<f32>,
    pub pitch_percent: Option<i8>,
}

impl EmotionTag {
    /// 按子串匹配分类，顺序即优先级
    pub fn classify(annotation: &str) -> Self {
        let lowered = annotation.to_lowercase();
        const TABLE: &[(&str, EmotionTag)] = &[
            ("laugh", EmotionTag::Laugh),
            ("sigh", EmotionTag::Sigh),
            ("gasp", EmotionTag::Gasp),
            ("excited", EmotionTag::Excited),
            ("whisper", EmotionTag::Whisper),
            ("thoughtful", EmotionTag::Thoughtful),
            ("warm", EmotionTag::Warm),
            ("throat", EmotionTag::ClearsThroat),
        ];
        TABLE
            .iter()
            .find(|(needle, _)| lowered.contains(needle))
            .map(|(_, tag)| *tag)
            .unwrap_or(EmotionTag::Other)
    }

    /// 情绪 → 韵律查找表
    ///
    /// gasp 与 excited 的音高效果重叠，保持原表不做合并
    pub fn adjustment(&self) -> ProsodyAdjustment {
        match self {
            EmotionTag::Laugh => ProsodyAdjustment {
                rate: None,
                pitch_percent: Some(0),
            },
            EmotionTag::Sigh => ProsodyAdjustment {
                rate: Some(0.97),
                pitch_percent: Some(-2),
            },
            EmotionTag::Gasp => ProsodyAdjustment {
                rate: Some(1.0),
                pitch_percent: Some(0),
            },
            EmotionTag::Excited => ProsodyAdjustment {
                rate: Some(1.02),
                pitch_percent: Some(0),
            },
            EmotionTag::Whisper => ProsodyAdjustment {
                rate: Some(0.95),
                pitch_percent: Some(-1),
            },
            EmotionTag::Thoughtful
            | EmotionTag::Warm
            | EmotionTag::ClearsThroat
            | EmotionTag::Other => ProsodyAdjustment::default(),
        }
    }
}

/// 韵律设置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProsodySetting {
    pub rate: f32,
    pub pitch_percent: i8,
}

impl Default for ProsodySetting {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            pitch_percent: DEFAULT_PITCH_PERCENT,
        }
    }
}

impl ProsodySetting {
    /// 应用调整：rate 与 pitch 分别以最后一次为准
    pub fn apply(&mut self, adjustment: ProsodyAdjustment) {
        if let Some(rate) = adjustment.rate {
            self.rate = rate;
        }
        if let Some(pitch) = adjustment.pitch_percent {
            self.pitch_percent = pitch;
        }
    }

    /// 标点覆盖：`!` 优先于 `?`
    pub fn for_punctuation(text: &str) -> Option<Self> {
        if text.contains('!') {
            Some(Self {
                rate: 1.01,
                pitch_percent: 0,
            })
        } else if text.contains('?') {
            Some(Self {
                rate: 0.99,
                pitch_percent: -1,
            })
        } else {
            None
        }
    }

    pub fn rate_attr(&self) -> String {
        format!("{:.2}", self.rate)
    }

    pub fn pitch_attr(&self) -> String {
        format!("{}%", self.pitch_percent)
    }
}

/// 解析后的一行对话
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueLine {
    pub speaker: Speaker,
    pub emotion_tags: Vec<EmotionTag>,
    /// 去掉主持人标签后的文本（仍含情绪标注）
    pub raw_text: String,
}

impl DialogueLine {
    /// 解析一行（调用方负责 trim 和过滤空行）
    pub fn parse(line: &str) -> Self {
        let (speaker, rest) = match SPEAKER_LABEL.captures(line) {
            Some(caps) => {
                let speaker = match caps.get(1).map(|m| m.as_str()) {
                    Some("2") => Speaker::Host2,
                    _ => Speaker::Host1,
                };
                let label_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
                (speaker, &line[label_end..])
            }
            None => (Speaker::Host1, line),
        };

        let raw_text = rest.trim().to_string();
        let emotion_tags = EMOTION_ANNOTATION
            .find_iter(&raw_text)
            .map(|m| EmotionTag::classify(m.as_str()))
            .collect();

        Self {
            speaker,
            emotion_tags,
            raw_text,
        }
    }

    /// 剥离情绪标注后的台词
    pub fn spoken_text(&self) -> String {
        EMOTION_ANNOTATION
            .replace_all(&self.raw_text, "")
            .trim()
            .to_string()
    }

    /// 先按标注顺序应用查找表，再由标点覆盖
    pub fn prosody(&self) -> ProsodySetting {
        let mut prosody = ProsodySetting::default();
        for tag in &self.emotion_tags {
            prosody.apply(tag.adjustment());
        }
        ProsodySetting::for_punctuation(&self.spoken_text()).unwrap_or(prosody)
    }
}

/// 按行拆分脚本：trim 后过滤空行
pub fn parse_script(script: &str) -> Vec<DialogueLine> {
    script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(DialogueLine::parse)
        .collect()
}
