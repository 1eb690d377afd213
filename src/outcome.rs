//! Per-record skip reasons and the batch summary.

use std::fmt;

use crate::decode::DecodeError;
use crate::library::LibraryError;
use crate::providers::ProviderError;

/// Why a record left the pipeline without being enriched.
///
/// Informational skips (the record simply had nothing to do) and per-item
/// failures share one type; [`SkipReason::is_failure`] tells them apart.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    /// Standalone note or attachment.
    #[error("not a regular item")]
    NotRegular,
    /// Record has no attachments.
    #[error("no attachments")]
    NoAttachments,
    /// Target field already filled; never overwritten.
    #[error("abstract already present")]
    HasAbstract,
    /// None of the attachments has the supported content type.
    #[error("no attachment of a supported type")]
    NoSupportedAttachment,
    /// The supported attachment has no extracted text.
    #[error("no text content found in attachment {attachment}")]
    TextUnavailable {
        /// Attachment title, or id when untitled.
        attachment: String,
    },
    /// The host failed while reading extracted text.
    #[error("error accessing text content for attachment {attachment}: {source}")]
    TextAccess {
        /// Attachment title, or id when untitled.
        attachment: String,
        /// Host error.
        source: LibraryError,
    },
    /// Title and abstract are both empty, nothing to classify.
    #[error("no title or abstract")]
    EmptyInput,
    /// Completion call failed.
    #[error(transparent)]
    Completion(#[from] ProviderError),
    /// Completion text could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The result was produced but could not be saved; it is discarded.
    #[error("failed to save result: {0}")]
    Persistence(#[source] LibraryError),
}

impl SkipReason {
    /// Whether this skip is a per-item failure rather than a no-op.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::TextAccess { .. } | Self::Completion(_) | Self::Decode(_) | Self::Persistence(_)
        )
    }
}

/// Which enrichment flow produced a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Abstract generation.
    Abstract,
    /// Subject tagging.
    Tagging,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abstract => f.write_str("abstract"),
            Self::Tagging => f.write_str("tagging"),
        }
    }
}

/// A record that was not enriched, with the reason.
#[derive(Debug)]
pub struct SkippedRecord {
    /// Host identifier.
    pub record_id: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// What a batch did. Returned for inspection; the run also logs it.
#[derive(Debug)]
pub struct BatchSummary {
    /// Flow that ran.
    pub flow: Flow,
    /// Records in the selection.
    pub total: usize,
    /// Records whose result was persisted.
    pub enriched: usize,
    /// Records that were skipped, in the order they were decided.
    pub skipped: Vec<SkippedRecord>,
}

impl BatchSummary {
    /// Empty summary for a selection of `total` records.
    pub fn new(flow: Flow, total: usize) -> Self {
        Self {
            flow,
            total,
            enriched: 0,
            skipped: Vec::new(),
        }
    }

    /// Count one persisted record.
    pub fn record_enriched(&mut self) {
        self.enriched = self.enriched.saturating_add(1);
    }

    /// Note one skipped record.
    pub fn record_skipped(&mut self, record_id: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedRecord {
            record_id: record_id.into(),
            reason,
        });
    }

    /// Number of per-item failures.
    pub fn failed(&self) -> usize {
        self.skipped.iter().filter(|s| s.reason.is_failure()).count()
    }

    /// The skip reason for a record, if it was skipped.
    pub fn reason_for(&self, record_id: &str) -> Option<&SkipReason> {
        self.skipped
            .iter()
            .find(|s| s.record_id == record_id)
            .map(|s| &s.reason)
    }
}
