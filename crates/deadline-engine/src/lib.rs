pub mod classifier;
pub mod detector;
pub mod error;
pub mod normalizer;
pub mod parse;
pub mod pipeline;
pub mod render;
pub mod resolver;

pub use classifier::{classify, Classification};
pub use detector::detect;
pub use error::EngineError;
pub use normalizer::{normalize, normalize_text, NormalizedConversation, RawItem};
pub use pipeline::Pipeline;
pub use render::OutputFormat;
pub use resolver::resolve;
