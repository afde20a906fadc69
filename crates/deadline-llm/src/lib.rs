pub mod prompts;
pub mod provider;
pub mod reliable;

pub mod mock;

pub use mock::MockOracle;
pub use provider::ChatCompletionsOracle;
pub use reliable::{ReliableOracle, RetryConfig};
