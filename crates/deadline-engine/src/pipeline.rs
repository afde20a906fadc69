use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, Instrument};

use deadline_core::commitment::Commitment;
use deadline_core::ids::RunId;
use deadline_core::oracle::Oracle;

use crate::classifier::classify;
use crate::detector::detect;
use crate::error::EngineError;
use crate::normalizer::{normalize, normalize_text, NormalizedConversation, RawItem};
use crate::resolver::resolve;

/// Runs detection, classification and resolution over a conversation.
///
/// Stages run one after another and each issues its oracle calls one
/// sentence at a time, so output order always matches document order.
pub struct Pipeline {
    oracle: Arc<dyn Oracle>,
    now: Option<DateTime<Utc>>,
}

impl Pipeline {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle, now: None }
    }

    /// Pin the clock used for status and fallback creation times.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn oracle(&self) -> &dyn Oracle {
        self.oracle.as_ref()
    }

    pub async fn run(&self, conversation: &NormalizedConversation) -> Result<Vec<Commitment>, EngineError> {
        let run_id = RunId::new();
        let span = tracing::info_span!(
            "pipeline",
            run_id = %run_id,
            oracle = self.oracle.name(),
            model = self.oracle.model()
        );

        async {
            let oracle = self.oracle.as_ref();
            let candidates = detect(oracle, &conversation.sentences).await?;
            let classified = classify(oracle, &candidates).await?;
            let commitments = resolve(oracle, &conversation.messages, classified, self.now).await?;

            info!(
                messages = conversation.messages.len(),
                sentences = conversation.sentences.len(),
                candidates = candidates.len(),
                commitments = commitments.len(),
                "pipeline complete"
            );
            Ok::<_, EngineError>(commitments)
        }
        .instrument(span)
        .await
    }

    /// Normalize `items` and run the pipeline over them.
    pub async fn run_items(&self, items: &[RawItem], channel: Option<&str>) -> Result<Vec<Commitment>, EngineError> {
        self.run(&normalize(items, channel)).await
    }

    /// Treat `text` as a single message and run the pipeline over it.
    pub async fn run_text(&self, text: &str) -> Result<Vec<Commitment>, EngineError> {
        self.run(&normalize_text(text, None, None, None)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use deadline_core::commitment::{CommitmentKind, CommitmentStatus};
    use deadline_core::errors::OracleError;
    use deadline_llm::{prompts, MockOracle};

    const REPORT: &str = "I will send the report by Friday. We should consider refactoring later.";

    fn scripted() -> MockOracle {
        MockOracle::new()
            .on(prompts::DETECTION_SYSTEM, "I will send the report", "YES")
            .on(prompts::DETECTION_SYSTEM, "refactoring later", "NO")
            .on(
                prompts::CLASSIFICATION_SYSTEM,
                "",
                r#"{"kind": "hard_commitment", "confidence": 0.92}"#,
            )
            .on(
                prompts::ATTRIBUTE_SYSTEM,
                "",
                r#"{"who": "I", "deadline_text": "by Friday"}"#,
            )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn report_scenario_yields_single_commitment() {
        let oracle = Arc::new(scripted());
        let pipeline = Pipeline::new(oracle.clone()).with_now(now());

        let out = pipeline.run_text(REPORT).await.unwrap();

        // "later" is a keyword, so both sentences reach the gate.
        assert_eq!(oracle.calls_matching(prompts::DETECTION_SYSTEM), 2);
        assert_eq!(oracle.calls_matching(prompts::CLASSIFICATION_SYSTEM), 1);
        assert_eq!(oracle.calls_matching(prompts::ATTRIBUTE_SYSTEM), 1);

        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_eq!(c.sentence, "I will send the report by Friday.");
        assert_eq!(c.full_message, REPORT);
        assert_eq!(c.who, "I");
        assert_eq!(c.kind, Some(CommitmentKind::HardCommitment));
        assert_eq!(c.kind_confidence, 0.92);
        assert_eq!(c.explicit_deadline_text.as_deref(), Some("by Friday"));
        assert_eq!(c.explicit_deadline_date, None);
        assert_eq!(c.status, CommitmentStatus::Unclear);
        assert_eq!(c.created_at, now());
    }

    #[tokio::test]
    async fn rerun_is_identical_except_ids() {
        let pipeline = Pipeline::new(Arc::new(scripted())).with_now(now());

        let first = pipeline.run_text(REPORT).await.unwrap();
        let second = pipeline.run_text(REPORT).await.unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_ne!(a.id, b.id);
            let mut b = b.clone();
            b.id = a.id.clone();
            assert_eq!(*a, b);
        }
    }

    #[tokio::test]
    async fn malformed_classification_is_absorbed() {
        let oracle = MockOracle::new()
            .on(prompts::DETECTION_SYSTEM, "", "YES")
            .on(prompts::CLASSIFICATION_SYSTEM, "", "I'd say it's a promise")
            .on(prompts::ATTRIBUTE_SYSTEM, "", "{}");
        let pipeline = Pipeline::new(Arc::new(oracle)).with_now(now());

        let out = pipeline.run_text("I'll take care of it.").await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, Some(CommitmentKind::SoftIntention));
        assert_eq!(out[0].kind_confidence, 0.3);
        assert_eq!(out[0].who, "Unassigned");
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_clamped_once() {
        let oracle = MockOracle::new()
            .on(prompts::DETECTION_SYSTEM, "", "YES")
            .on(prompts::CLASSIFICATION_SYSTEM, "", r#"{"kind": "team_promise", "confidence": 7}"#)
            .on(prompts::ATTRIBUTE_SYSTEM, "", r#"{"who": "we", "deadline_text": "  by EOD"}"#);
        let pipeline = Pipeline::new(Arc::new(oracle)).with_now(now());

        let out = pipeline.run_text("We will ship it by EOD.").await.unwrap();

        assert_eq!(out[0].kind_confidence, 1.0);
        assert_eq!(out[0].explicit_deadline_text.as_deref(), Some("  by EOD"));
        assert_eq!(out[0].raw_llm_labels.classification["confidence"], 7);
    }

    #[tokio::test]
    async fn multi_message_order_and_back_references() {
        let items = vec![
            RawItem::new("Morning! I'll follow up with legal.")
                .sender("ana")
                .timestamp("2024-09-01T09:00:00Z"),
            RawItem::new("Nothing from me."),
            RawItem::new("We will fix the login bug. Thanks.")
                .sender("ben")
                .timestamp("2024-09-01T09:05:00Z"),
        ];
        let oracle = MockOracle::new()
            .on(prompts::DETECTION_SYSTEM, "", "YES")
            .on(prompts::CLASSIFICATION_SYSTEM, "legal", r#"{"kind": "personal_promise", "confidence": 0.7}"#)
            .on(prompts::CLASSIFICATION_SYSTEM, "login", r#"{"kind": "team_promise", "confidence": 0.8}"#)
            .on(prompts::ATTRIBUTE_SYSTEM, "legal", r#"{"who": "I", "deadline_text": null}"#)
            .on(prompts::ATTRIBUTE_SYSTEM, "login", r#"{"who": "we", "deadline_text": null}"#);
        let pipeline = Pipeline::new(Arc::new(oracle)).with_now(now());

        let out = pipeline.run_items(&items, Some("slack")).await.unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].sentence, "I'll follow up with legal.");
        assert_eq!(out[0].source.sender.as_deref(), Some("ana"));
        assert_eq!(out[0].kind, Some(CommitmentKind::PersonalPromise));
        assert_eq!(out[1].sentence, "We will fix the login bug.");
        assert_eq!(out[1].full_message, "We will fix the login bug. Thanks.");
        assert_eq!(out[1].source.channel.as_deref(), Some("slack"));
        assert_eq!(
            out[1].created_at,
            Utc.with_ymd_and_hms(2024, 9, 1, 9, 5, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn transport_failure_aborts_the_run() {
        let oracle = MockOracle::new()
            .on(prompts::DETECTION_SYSTEM, "", "YES")
            .on(prompts::CLASSIFICATION_SYSTEM, "", OracleError::ServerError { status: 502, body: "bad gateway".into() });
        let pipeline = Pipeline::new(Arc::new(oracle));

        let err = pipeline.run_text("I will do it.").await.unwrap_err();
        assert!(matches!(err, EngineError::Oracle(OracleError::ServerError { status: 502, .. })));
    }

    #[tokio::test]
    async fn no_keywords_means_no_oracle_calls() {
        let oracle = Arc::new(MockOracle::new());
        let pipeline = Pipeline::new(oracle.clone());

        let out = pipeline.run_text("The deploy finished. Logs look clean.").await.unwrap();

        assert!(out.is_empty());
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let pipeline = Pipeline::new(Arc::new(MockOracle::new()));
        assert!(pipeline.run_text("   ").await.unwrap().is_empty());
        assert!(pipeline.run_items(&[], None).await.unwrap().is_empty());
    }

    #[test]
    fn exposes_oracle() {
        let pipeline = Pipeline::new(Arc::new(MockOracle::new()));
        assert_eq!(pipeline.oracle().name(), "mock");
    }
}
