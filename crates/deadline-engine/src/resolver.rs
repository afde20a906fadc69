//! Attribute extraction and assembly of final [`Commitment`] records.
//!
//! Deadline phrases are stored verbatim. Nothing here turns a phrase into a
//! date, so `explicit_deadline_date` stays `None` and every status is
//! `unclear` until a deterministic date parser is added.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use deadline_core::commitment::{Commitment, CommitmentStatus, RawLabels, SourceMessage, UNASSIGNED};
use deadline_core::ids::CommitmentId;
use deadline_core::oracle::Oracle;
use deadline_llm::prompts;

use crate::classifier::Classification;
use crate::error::EngineError;
use crate::parse::{parse_json_object, parse_or_default, raw_payload, string_field};

/// Responsible party and deadline phrase for one sentence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub who: String,
    pub deadline_text: Option<String>,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            who: UNASSIGNED.to_string(),
            deadline_text: None,
        }
    }
}

fn attributes_from_object(map: &Map<String, Value>) -> Attributes {
    Attributes {
        who: string_field(map, "who").unwrap_or_else(|| UNASSIGNED.to_string()),
        deadline_text: map
            .get("deadline_text")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// Interpret one attribute answer. Never fails.
pub fn parse_attributes(answer: &str) -> Attributes {
    parse_or_default(
        "resolve",
        answer,
        |raw| parse_json_object(raw).map(|map| attributes_from_object(&map)),
        Attributes::default,
    )
}

/// Build one commitment per classified item, in order.
///
/// `now` fixes the status clock and the fallback creation time; it defaults
/// to the wall clock at call time.
#[instrument(skip_all, fields(items = classified.len()))]
pub async fn resolve(
    oracle: &dyn Oracle,
    messages: &[Arc<SourceMessage>],
    classified: Vec<Classification>,
    now: Option<DateTime<Utc>>,
) -> Result<Vec<Commitment>, EngineError> {
    let now = now.unwrap_or_else(Utc::now);
    let mut commitments = Vec::with_capacity(classified.len());

    for item in classified {
        let source = messages
            .get(item.span.source_index)
            .cloned()
            .ok_or(EngineError::MessageIndexOutOfRange {
                index: item.span.source_index,
                len: messages.len(),
            })?;

        let answer = oracle
            .respond(prompts::ATTRIBUTE_SYSTEM, &prompts::sentence_prompt(&item.span.text))
            .await?;
        let attributes = parse_attributes(&answer);

        let explicit_deadline_date = None;
        let status = CommitmentStatus::derive(explicit_deadline_date, now);
        debug!(
            sentence = %item.span.text,
            who = %attributes.who,
            deadline = ?attributes.deadline_text,
            %status,
            "resolved"
        );

        commitments.push(Commitment {
            id: CommitmentId::new(),
            sentence: item.span.text,
            full_message: source.text.clone(),
            who: attributes.who,
            kind: Some(item.kind),
            kind_confidence: item.confidence,
            created_at: source.timestamp.unwrap_or(now),
            explicit_deadline_text: attributes.deadline_text,
            explicit_deadline_date,
            status,
            source,
            raw_llm_labels: RawLabels {
                classification: item.raw,
                attributes: raw_payload(&answer),
            },
        });
    }

    info!(commitments = commitments.len(), "resolution complete");
    Ok(commitments)
}
