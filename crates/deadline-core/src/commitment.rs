//! Data model shared by every pipeline stage.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::CommitmentId;

/// Responsible party recorded when nobody is explicitly named.
pub const UNASSIGNED: &str = "Unassigned";

/// One entry in a chronological conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceMessage {
    pub text: String,
    pub sender: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// e.g. "slack", "email", "github"
    pub channel: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SourceMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: None,
            timestamp: None,
            channel: None,
            metadata: Map::new(),
        }
    }
}

/// A sentence lifted from a [`SourceMessage`].
///
/// `source_index` points into the conversation's message list. Offsets are
/// byte positions in the owning message text and always lie on char
/// boundaries, so `&message.text[char_start..char_end]` never panics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceSpan {
    pub text: String,
    pub source_index: usize,
    pub char_start: usize,
    pub char_end: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentKind {
    PersonalPromise,
    TeamPromise,
    SoftIntention,
    HardCommitment,
}

impl CommitmentKind {
    pub const ALL: [CommitmentKind; 4] = [
        Self::PersonalPromise,
        Self::TeamPromise,
        Self::SoftIntention,
        Self::HardCommitment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PersonalPromise => "personal_promise",
            Self::TeamPromise => "team_promise",
            Self::SoftIntention => "soft_intention",
            Self::HardCommitment => "hard_commitment",
        }
    }

    /// Strict lookup of an external label. Only the four exact identifiers
    /// match; any other spelling, case or padding is `None`.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }

    /// Fail-soft lookup: unknown labels become [`CommitmentKind::SoftIntention`].
    pub fn from_label(label: &str) -> Self {
        Self::parse(label).unwrap_or(Self::SoftIntention)
    }
}

impl fmt::Display for CommitmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentStatus {
    Pending,
    Overdue,
    Unclear,
}

impl CommitmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Unclear => "unclear",
        }
    }

    /// Status from a resolved deadline date. No date means `Unclear`.
    pub fn derive(deadline_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match deadline_date {
            None => Self::Unclear,
            Some(date) if date < now => Self::Overdue,
            Some(_) => Self::Pending,
        }
    }
}

impl fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Oracle payloads kept for audit, exactly as the stages received them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLabels {
    pub classification: Value,
    pub attributes: Value,
}

/// A detected promise or obligation.
///
/// Deadlines are never invented: `explicit_deadline_text` holds the phrase as
/// written and `explicit_deadline_date` stays `None` until a deterministic
/// date parser exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub id: CommitmentId,
    pub sentence: String,
    pub full_message: String,
    pub who: String,
    pub kind: Option<CommitmentKind>,
    pub kind_confidence: f64,
    pub created_at: DateTime<Utc>,
    pub explicit_deadline_text: Option<String>,
    pub explicit_deadline_date: Option<DateTime<Utc>>,
    pub status: CommitmentStatus,
    pub source: Arc<SourceMessage>,
    pub raw_llm_labels: RawLabels,
}
