use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use deadline_core::errors::OracleError;
use deadline_core::oracle::Oracle;

/// A canned answer.
#[derive(Clone, Debug)]
pub enum MockReply {
    Text(String),
    Error(OracleError),
}

impl From<&str> for MockReply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MockReply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<OracleError> for MockReply {
    fn from(error: OracleError) -> Self {
        Self::Error(error)
    }
}

/// A recorded `respond` invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockCall {
    pub system_prompt: String,
    pub user_prompt: String,
}

struct Rule {
    system_contains: String,
    user_contains: String,
    reply: MockReply,
}

/// Deterministic oracle for tests and offline runs.
///
/// Lookup order per call: the first rule whose fragments both occur in the
/// prompts, then the next queued reply, then the fallback. With none of
/// those the call fails with `InvalidRequest`.
#[derive(Default)]
pub struct MockOracle {
    rules: Vec<Rule>,
    queue: Mutex<VecDeque<MockReply>>,
    fallback: Option<MockReply>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `reply` when the system prompt contains `system_contains` and
    /// the user prompt contains `user_contains`. Empty fragments match anything.
    pub fn on(
        mut self,
        system_contains: impl Into<String>,
        user_contains: impl Into<String>,
        reply: impl Into<MockReply>,
    ) -> Self {
        self.rules.push(Rule {
            system_contains: system_contains.into(),
            user_contains: user_contains.into(),
            reply: reply.into(),
        });
        self
    }

    /// Queue a reply for the next call no rule matches.
    pub fn then(self, reply: impl Into<MockReply>) -> Self {
        self.queue.lock().push_back(reply.into());
        self
    }

    /// Reply used once rules and queue are exhausted.
    pub fn otherwise(mut self, reply: impl Into<MockReply>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of calls whose system prompt contained `fragment`.
    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.system_prompt.contains(fragment))
            .count()
    }

    fn pick(&self, system_prompt: &str, user_prompt: &str) -> Option<MockReply> {
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| system_prompt.contains(&r.system_contains) && user_prompt.contains(&r.user_contains))
        {
            return Some(rule.reply.clone());
        }
        self.queue.lock().pop_front().or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Oracle for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        let idx = {
            let mut calls = self.calls.lock();
            calls.push(MockCall {
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
            });
            calls.len() - 1
        };

        match self.pick(system_prompt, user_prompt) {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Error(e)) => Err(e),
            None => Err(OracleError::InvalidRequest(format!(
                "MockOracle: no response configured for call {idx}"
            ))),
        }
    }
}
