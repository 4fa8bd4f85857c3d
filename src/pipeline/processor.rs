//! Pipeline orchestrator — normalizes, assesses, and persists each event.
//!
//! **Core invariant: a record is persisted either fully enriched or not
//! at all.** Analysis is merged exactly once before the single `insert`
//! call; a failure anywhere drops the message for this run (no retry)
//! and never terminates the ingestion loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::PipelineError;
use crate::pipeline::normalize::normalize;
use crate::pipeline::rules::RuleEngine;
use crate::pipeline::types::InboundEvent;
use crate::store::MessageStore;

/// Message processor — the per-event pipeline boundary.
///
/// Holds no state across events beyond its collaborators; every
/// invocation is independent.
pub struct MessageProcessor {
    store: Arc<dyn MessageStore>,
    rules: RuleEngine,
}

impl MessageProcessor {
    /// Create a new processor over a persistence collaborator and rule set.
    pub fn new(store: Arc<dyn MessageStore>, rules: RuleEngine) -> Self {
        Self { store, rules }
    }

    /// Process a single inbound event: normalize → assess → persist.
    ///
    /// Returns the store-assigned document id. Persistence is invoked
    /// exactly once; on failure the enriched record is discarded and the
    /// error reported to the caller.
    pub async fn process(&self, event: InboundEvent) -> Result<String, PipelineError> {
        debug!(
            message_id = event.message_id,
            chat_id = event.chat_id,
            "Processing inbound event"
        );

        let mut record = normalize(&event);
        let assessment = self.rules.evaluate(&record);

        if assessment.is_suspicious {
            warn!(
                message_id = record.message_id,
                chat_id = record.chat_id,
                risk_score = assessment.risk_score,
                reasons = ?assessment.reasons,
                "Suspicious message flagged"
            );
        }

        record.analysis = Some(assessment);

        let doc_id = self.store.insert(&record).await?;
        debug!(
            message_id = record.message_id,
            doc_id = %doc_id,
            "Record persisted"
        );
        Ok(doc_id)
    }

    /// Consume events from the session queue until it closes.
    ///
    /// One event is fully processed before the next is taken; the queue
    /// absorbs arrivals while a persistence call is in flight. Per-event
    /// failures are reported and the event dropped — the loop itself
    /// never fails.
    pub async fn run(&self, mut events: mpsc::Receiver<InboundEvent>) {
        info!("Ingestion loop started");
        let mut processed: u64 = 0;

        while let Some(event) = events.recv().await {
            let message_id = event.message_id;
            match self.process(event).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    error!(message_id, error = %e, "Dropping event after pipeline failure");
                }
            }
        }

        info!(processed, "Ingestion loop stopped (event stream closed)");
    }
}
