//! Batch orchestration for the two enrichment flows.
//!
//! Both flows walk the selection sequentially, one completion call at a time,
//! and finish every side effect for record N before record N+1 is looked at.
//! Per-record failures become a [`SkipReason`], are logged, and never abort
//! the batch.
//!
//! The flows deliberately differ: the abstract flow saves transactionally and
//! pauses after every completed call; the tagging flow uses a simple save and
//! does not pause.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::RunSettings;
use crate::decode::{decode_abstract, decode_tags, tag_text};
use crate::gate::ContentGate;
use crate::library::{Library, Record, FIELD_ABSTRACT, FIELD_TITLE};
use crate::outcome::{BatchSummary, Flow, SkipReason};
use crate::prompts::PromptBuilder;
use crate::providers::LlmProvider;

fn log_skip(record_id: &str, reason: &SkipReason) {
    if reason.is_failure() {
        warn!(record = %record_id, reason = %reason, "record skipped");
    } else {
        debug!(record = %record_id, reason = %reason, "record skipped");
    }
}

fn log_completion(summary: &BatchSummary, message: &str) {
    info!(
        flow = %summary.flow,
        total = summary.total,
        enriched = summary.enriched,
        skipped = summary.skipped.len(),
        failed = summary.failed(),
        "{message}"
    );
}

// ---------------------------------------------------------------------------
// Abstract flow
// ---------------------------------------------------------------------------

/// Fills empty abstracts from attachment text.
pub struct AbstractPipeline {
    library: Arc<dyn Library>,
    provider: Arc<dyn LlmProvider>,
    prompts: PromptBuilder,
    content_type: String,
    delay: Duration,
}

impl AbstractPipeline {
    /// Wire the pipeline to a host, a completion client and run settings.
    pub fn new(
        library: Arc<dyn Library>,
        provider: Arc<dyn LlmProvider>,
        prompts: PromptBuilder,
        settings: &RunSettings,
    ) -> Self {
        Self {
            library,
            provider,
            prompts,
            content_type: settings.supported_content_type.clone(),
            delay: settings.abstract_delay(),
        }
    }

    /// Process the selection in order.
    pub async fn run(&self, records: Vec<Record>) -> BatchSummary {
        let mut summary = BatchSummary::new(Flow::Abstract, records.len());
        let gate = ContentGate::new(self.library.as_ref(), &self.content_type);
        let mut eligible = gate.select_eligible(records);

        while let Some((record, text)) = eligible.next().await {
            for (id, reason) in eligible.take_skipped() {
                summary.record_skipped(id, reason);
            }

            let record_id = record.id.clone();
            match self.enrich(record, &text).await {
                Ok(()) => summary.record_enriched(),
                Err(reason) => {
                    log_skip(&record_id, &reason);
                    summary.record_skipped(record_id, reason);
                }
            }
        }
        for (id, reason) in eligible.take_skipped() {
            summary.record_skipped(id, reason);
        }

        log_completion(&summary, "abstract generation process completed");
        summary
    }

    async fn enrich(&self, mut record: Record, text: &str) -> Result<(), SkipReason> {
        let request = self.prompts.abstract_request(text);
        let raw = self.provider.complete(&request).await?;
        let generated = decode_abstract(&raw);

        let saved = self.persist(&mut record, generated).await;
        tokio::time::sleep(self.delay).await;
        saved
    }

    async fn persist(&self, record: &mut Record, generated: String) -> Result<(), SkipReason> {
        record
            .set_field(FIELD_ABSTRACT, generated)
            .map_err(SkipReason::Persistence)?;
        self.library
            .save_tx(record)
            .await
            .map_err(SkipReason::Persistence)?;
        info!(record = %record.id, title = %record.title, "abstract added");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tagging flow
// ---------------------------------------------------------------------------

/// Adds subject tags classified from title and abstract.
pub struct TaggingPipeline {
    library: Arc<dyn Library>,
    provider: Arc<dyn LlmProvider>,
    prompts: PromptBuilder,
}

impl TaggingPipeline {
    /// Wire the pipeline to a host and a completion client.
    pub fn new(
        library: Arc<dyn Library>,
        provider: Arc<dyn LlmProvider>,
        prompts: PromptBuilder,
    ) -> Self {
        Self {
            library,
            provider,
            prompts,
        }
    }

    /// Process the selection in order.
    pub async fn run(&self, records: Vec<Record>) -> BatchSummary {
        let mut summary = BatchSummary::new(Flow::Tagging, records.len());
        if records.is_empty() {
            info!("no items selected");
            return summary;
        }

        for mut record in records {
            match self.classify(&mut record).await {
                Ok(added) => {
                    info!(record = %record.id, title = %record.title, added, "tags added to item");
                    summary.record_enriched();
                }
                Err(reason) => {
                    log_skip(&record.id, &reason);
                    summary.record_skipped(record.id, reason);
                }
            }
        }

        log_completion(&summary, "subject tags added based on AI classification");
        summary
    }

    /// Returns how many tags were new to the record.
    async fn classify(&self, record: &mut Record) -> Result<usize, SkipReason> {
        let title = record.field(FIELD_TITLE).unwrap_or_default();
        let abstract_note = record.field(FIELD_ABSTRACT).unwrap_or_default();
        let request = self
            .prompts
            .classification_request(title, abstract_note)
            .ok_or(SkipReason::EmptyInput)?;

        let raw = self.provider.complete(&request).await?;
        debug!(record = %record.id, raw = %raw, "raw API response");

        let tags = decode_tags(&raw)?;
        let mut added = 0_usize;
        for tag in tags.iter().filter_map(tag_text) {
            if record.add_tag(tag) {
                added = added.saturating_add(1);
            }
        }

        self.library
            .save(record)
            .await
            .map_err(SkipReason::Persistence)?;
        Ok(added)
    }
}
