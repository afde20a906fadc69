use deadline_core::errors::OracleError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("sentence references message {index} but the conversation has {len} messages")]
    MessageIndexOutOfRange { index: usize, len: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
