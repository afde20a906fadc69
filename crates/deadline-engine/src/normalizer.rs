//! Turns raw chronological items into messages plus sentence spans.
//!
//! Segmentation is purely lexical. Swap in another [`Segmenter`] for smarter
//! boundary detection; downstream stages only see [`SentenceSpan`]s.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use deadline_core::commitment::{SentenceSpan, SourceMessage};

/// Sentence-terminal punctuation followed by whitespace, or a newline run.
static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+|\n+").unwrap());

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// A timestamp as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampInput {
    Parsed(DateTime<Utc>),
    Iso(String),
}

impl TimestampInput {
    fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Parsed(ts) => Some(*ts),
            Self::Iso(raw) => parse_timestamp(raw),
        }
    }
}

/// One loosely-typed input record. Every field is optional.
///
/// Deserialization never rejects a record over field types: scalar text
/// fields are stringified, and timestamps or metadata of the wrong shape
/// are dropped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default, deserialize_with = "lenient::scalar_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar_string")]
    pub sender: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub timestamp: Option<TimestampInput>,
    #[serde(default, deserialize_with = "lenient::scalar_string")]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub metadata: Option<Map<String, Value>>,
}

/// Serde helpers accepting any JSON value for [`RawItem`] fields.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::{Map, Value};

    use super::TimestampInput;

    pub fn scalar_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    /// Only strings can carry a timestamp; anything else is unset.
    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TimestampInput>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(TimestampInput::Iso(s)),
            _ => None,
        })
    }

    pub fn object<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Map<String, Value>>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Object(map) => Some(map),
            _ => None,
        })
    }
}

impl RawItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(TimestampInput::Iso(timestamp.into()));
        self
    }

    pub fn parsed_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(TimestampInput::Parsed(timestamp));
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Canonical sentence-level view of a conversation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedConversation {
    pub messages: Vec<Arc<SourceMessage>>,
    pub sentences: Vec<SentenceSpan>,
}

impl NormalizedConversation {
    pub fn message(&self, index: usize) -> Option<&Arc<SourceMessage>> {
        self.messages.get(index)
    }
}

/// Splits message text into sentence fragments.
pub trait Segmenter {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Splits on `. ! ?` followed by whitespace (punctuation kept) and on newlines.
#[derive(Clone, Copy, Debug, Default)]
pub struct PunctuationSegmenter;

impl Segmenter for PunctuationSegmenter {
    fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        let mut fragments = Vec::new();
        let mut last = 0;

        for m in SENTENCE_BREAK.find_iter(text) {
            // A punctuation match keeps its first char with the sentence.
            let end = if text[m.start()..].starts_with('\n') {
                m.start()
            } else {
                m.start() + 1
            };
            fragments.push(&text[last..end]);
            last = m.end();
        }
        fragments.push(&text[last..]);

        fragments
            .into_iter()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Parse an ISO-8601 timestamp. Naive values are taken as UTC; anything
/// unrecognised yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(ts) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Normalize chronological items with the default segmenter.
///
/// `channel`, when given, overrides each item's own channel.
pub fn normalize(items: &[RawItem], channel: Option<&str>) -> NormalizedConversation {
    normalize_with(&PunctuationSegmenter, items, channel)
}

/// Normalize a single free-form text blob.
pub fn normalize_text(
    text: &str,
    sender: Option<&str>,
    timestamp: Option<DateTime<Utc>>,
    channel: Option<&str>,
) -> NormalizedConversation {
    let item = RawItem {
        text: Some(text.to_string()),
        sender: sender.map(str::to_string),
        timestamp: timestamp.map(TimestampInput::Parsed),
        channel: channel.map(str::to_string),
        metadata: None,
    };
    normalize(&[item], channel)
}

pub fn normalize_with<S: Segmenter + ?Sized>(
    segmenter: &S,
    items: &[RawItem],
    channel: Option<&str>,
) -> NormalizedConversation {
    let mut conversation = NormalizedConversation::default();

    for raw in items {
        let text = raw.text.as_deref().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }

        let timestamp = raw.timestamp.as_ref().and_then(TimestampInput::resolve);
        if timestamp.is_none() && raw.timestamp.is_some() {
            debug!(timestamp = ?raw.timestamp, "unparseable timestamp, leaving it unset");
        }

        let message = SourceMessage {
            text: text.to_string(),
            sender: raw.sender.clone(),
            timestamp,
            channel: channel.map(str::to_string).or_else(|| raw.channel.clone()),
            metadata: raw.metadata.clone().unwrap_or_default(),
        };
        let source_index = conversation.messages.len();
        conversation
            .sentences
            .extend(locate_spans(text, segmenter.split(text), source_index));
        conversation.messages.push(Arc::new(message));
    }

    debug!(
        messages = conversation.messages.len(),
        sentences = conversation.sentences.len(),
        "normalized conversation"
    );
    conversation
}

/// Assign offsets by searching each fragment at or after the previous end.
fn locate_spans(text: &str, fragments: Vec<String>, source_index: usize) -> Vec<SentenceSpan> {
    let mut offset = 0;
    fragments
        .into_iter()
        .map(|fragment| {
            let (char_start, char_end) = match text[offset..].find(&fragment) {
                Some(pos) => (offset + pos, offset + pos + fragment.len()),
                None => (offset, floor_char_boundary(text, offset + fragment.len())),
            };
            offset = char_end;
            SentenceSpan {
                text: fragment,
                source_index,
                char_start,
                char_end,
            }
        })
        .collect()
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
