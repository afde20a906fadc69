pub mod commitment;
pub mod config;
pub mod errors;
pub mod ids;
pub mod oracle;
pub mod security;
