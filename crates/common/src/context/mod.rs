//! Query preparation for the answer service
//!
//! - Sanitizing raw user input into a plain-text query
//! - Templating the query and retrieved documents into the
//!   chain-of-thought context sent with the question

mod chain_of_thought;
mod sanitizer;

pub use chain_of_thought::{chain_of_thought, NO_DOCUMENTS_LINE};
pub use sanitizer::sanitize_text;
