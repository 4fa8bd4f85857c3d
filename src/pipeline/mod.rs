//! Message normalization and rule-based risk-scoring pipeline.
//!
//! Flow: inbound event → normalizer (+ URL extractor) → canonical record
//! → rule engine → enriched record → persistence collaborator.

pub mod normalize;
pub mod processor;
pub mod rules;
pub mod types;
pub mod urls;

pub use normalize::normalize;
pub use processor::MessageProcessor;
pub use rules::RuleEngine;
pub use types::{
    ChatInfo, ChatKind, EventSource, EventStream, ForwardInfo, InboundEvent, MediaKind,
    MessageRecord, RiskAssessment, RiskLabel, SenderInfo,
};
pub use urls::extract_urls;
