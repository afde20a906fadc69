use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::OracleError;

/// A natural-language understanding service: one prompt pair in, free text out.
///
/// Implementations are expected to answer deterministically (temperature 0).
#[async_trait]
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    async fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError>;
}

#[async_trait]
impl<T: Oracle + ?Sized> Oracle for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    async fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        (**self).respond(system_prompt, user_prompt).await
    }
}
