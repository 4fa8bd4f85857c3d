//! Chat-stream ingestion with rule-based risk scoring.
//!
//! A `TelegramSession` long-polls for new messages, each update is
//! normalized into a `MessageRecord`, scored by the `RuleEngine`, and
//! persisted to a local libSQL document store.

pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;

pub use error::{Error, Result};
