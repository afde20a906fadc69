use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use deadline_core::commitment::{CommitmentKind, SentenceSpan};
use deadline_core::oracle::Oracle;
use deadline_llm::prompts;

use crate::error::EngineError;
use crate::parse::{coerce_f64, parse_json_object, parse_or_default, raw_payload};

/// Kind and confidence used when the answer is not a JSON object.
pub const UNPARSEABLE_KIND: CommitmentKind = CommitmentKind::SoftIntention;
pub const UNPARSEABLE_CONFIDENCE: f64 = 0.3;
/// Confidence used when the object lacks a usable `confidence`.
pub const MISSING_CONFIDENCE: f64 = 0.5;

/// A candidate sentence with its type label.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub span: SentenceSpan,
    pub kind: CommitmentKind,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    /// The oracle's answer as received (parsed JSON, or the raw text).
    pub raw: Value,
}

fn labels_from_object(map: &Map<String, Value>) -> (CommitmentKind, f64) {
    let kind = map
        .get("kind")
        .and_then(Value::as_str)
        .map_or(CommitmentKind::SoftIntention, CommitmentKind::from_label);
    let confidence = map
        .get("confidence")
        .and_then(coerce_f64)
        .map_or(MISSING_CONFIDENCE, |c| c.clamp(0.0, 1.0));
    (kind, confidence)
}

/// Interpret one classification answer. Never fails.
pub fn parse_labels(answer: &str) -> (CommitmentKind, f64) {
    parse_or_default(
        "classify",
        answer,
        |raw| parse_json_object(raw).map(|map| labels_from_object(&map)),
        || (UNPARSEABLE_KIND, UNPARSEABLE_CONFIDENCE),
    )
}

/// Label every candidate. Emits exactly one [`Classification`] per input, in order.
#[instrument(skip_all, fields(candidates = spans.len()))]
pub async fn classify(oracle: &dyn Oracle, spans: &[SentenceSpan]) -> Result<Vec<Classification>, EngineError> {
    let mut results = Vec::with_capacity(spans.len());

    for span in spans {
        let answer = oracle
            .respond(prompts::CLASSIFICATION_SYSTEM, &prompts::sentence_prompt(&span.text))
            .await?;
        let (kind, confidence) = parse_labels(&answer);
        debug!(sentence = %span.text, %kind, confidence, "classified");

        results.push(Classification {
            span: span.clone(),
            kind,
            confidence,
            raw: raw_payload(&answer),
        });
    }

    info!(classified = results.len(), "classification complete");
    Ok(results)
}
