//! RAG Chatbot Common Library
//!
//! Shared code for the chatbot gateway:
//! - Upstream HTTP client for the embeddings, search and answer services
//! - Query sanitizing and chain-of-thought context templating
//! - The sequential query pipeline
//! - Error types, configuration and metrics

pub mod config;
pub mod context;
pub mod errors;
pub mod metrics;
pub mod pipeline;
pub mod upstream;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use pipeline::{QueryOutcome, RagPipeline};
pub use upstream::{HttpUpstream, Upstream, UpstreamError};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Response returned when the answer service fails or gives no answer
pub const FALLBACK_ANSWER: &str = "Sorry, I couldn't generate a response at the moment.";
