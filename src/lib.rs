pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod i18n;
pub mod llm;
pub mod notify;
pub mod parser;
pub mod search;
pub mod types;
pub mod vector;

// Re-export commonly used types
pub use config::Config;
pub use error::OrchestrationError;
pub use generator::workflow::launch;
