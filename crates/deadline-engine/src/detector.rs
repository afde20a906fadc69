use tracing::{debug, info, instrument};

use deadline_core::commitment::SentenceSpan;
use deadline_core::oracle::Oracle;
use deadline_llm::prompts;

use crate::error::EngineError;
use crate::parse::parse_or_default;

/// Phrases that make a sentence worth asking the oracle about.
pub const COMMITMENT_KEYWORDS: &[&str] = &[
    "i will",
    "i'll",
    "we will",
    "we'll",
    "will do",
    "will fix",
    "we should",
    "i should",
    "todo",
    "later",
    "follow up",
    "follow-up",
    "get back to you",
    "take care of it",
    "address this",
];

/// Case-insensitive substring match against [`COMMITMENT_KEYWORDS`].
pub fn matches_keyword(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    COMMITMENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// `Some(true)` only for an exact `YES` after trimming and upper-casing.
fn parse_verdict(answer: &str) -> Option<bool> {
    match answer.trim().to_uppercase().as_str() {
        "YES" => Some(true),
        "NO" => Some(false),
        _ => None,
    }
}

/// Whether a gate answer admits the sentence. Anything but `YES` excludes it.
pub fn is_affirmative(answer: &str) -> bool {
    parse_or_default("detect", answer, parse_verdict, || false)
}

/// Keep the sentences that pass the keyword prefilter and the oracle gate.
///
/// Sentences without a keyword never reach the oracle. Order is preserved.
#[instrument(skip_all, fields(sentences = sentences.len()))]
pub async fn detect(oracle: &dyn Oracle, sentences: &[SentenceSpan]) -> Result<Vec<SentenceSpan>, EngineError> {
    let mut candidates = Vec::new();
    let mut asked = 0usize;

    for span in sentences {
        if !matches_keyword(&span.text) {
            continue;
        }

        asked += 1;
        let answer = oracle
            .respond(prompts::DETECTION_SYSTEM, &prompts::sentence_prompt(&span.text))
            .await?;
        let keep = is_affirmative(&answer);
        debug!(sentence = %span.text, answer = %answer.trim(), keep, "detection verdict");

        if keep {
            candidates.push(span.clone());
        }
    }

    info!(asked, candidates = candidates.len(), "detection complete");
    Ok(candidates)
}
