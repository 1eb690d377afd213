//! Content gate for the abstract flow.
//!
//! Per record, in order: regular items only, at least one attachment, empty
//! abstract, then the first attachment of the supported content type must
//! yield non-empty text. Only that one attachment is ever read; a record
//! whose first supported attachment has no text is skipped outright.

use std::vec;

use tracing::{debug, warn};

use crate::library::{Library, Record, FIELD_ABSTRACT};
use crate::outcome::SkipReason;

/// Decides eligibility and fetches source text.
pub struct ContentGate<'a> {
    library: &'a dyn Library,
    content_type: &'a str,
}

impl<'a> ContentGate<'a> {
    /// Gate over `library`, accepting attachments of `content_type` only.
    pub fn new(library: &'a dyn Library, content_type: &'a str) -> Self {
        Self {
            library,
            content_type,
        }
    }

    /// Check one record and return its source text when eligible.
    ///
    /// # Errors
    ///
    /// Returns the [`SkipReason`] when the record must not be processed.
    pub async fn admit(&self, record: &Record) -> Result<String, SkipReason> {
        if !record.is_regular() {
            return Err(SkipReason::NotRegular);
        }
        if record.attachments.is_empty() {
            return Err(SkipReason::NoAttachments);
        }
        if record
            .field(FIELD_ABSTRACT)
            .is_some_and(|existing| !existing.is_empty())
        {
            return Err(SkipReason::HasAbstract);
        }

        for attachment_id in &record.attachments {
            let attachment = match self.library.attachment(attachment_id).await {
                Ok(attachment) => attachment,
                Err(e) => {
                    debug!(
                        record = %record.id,
                        attachment = %attachment_id,
                        error = %e,
                        "attachment lookup failed"
                    );
                    continue;
                }
            };

            if attachment.content_type != self.content_type {
                debug!(
                    record = %record.id,
                    content_type = %attachment.content_type,
                    "skipping unsupported attachment type"
                );
                continue;
            }

            let label = if attachment.title.is_empty() {
                attachment.id.clone()
            } else {
                attachment.title.clone()
            };

            return match self.library.attachment_text(&attachment.id).await {
                Ok(Some(text)) if !text.trim().is_empty() => Ok(text),
                Ok(_) => Err(SkipReason::TextUnavailable { attachment: label }),
                Err(source) => Err(SkipReason::TextAccess {
                    attachment: label,
                    source,
                }),
            };
        }

        Err(SkipReason::NoSupportedAttachment)
    }

    /// Lazily walk `records`, yielding only the eligible ones.
    pub fn select_eligible(self, records: Vec<Record>) -> EligibleRecords<'a> {
        EligibleRecords {
            gate: self,
            records: records.into_iter(),
            skipped: Vec::new(),
        }
    }
}

/// Single-pass sequence of `(record, source_text)` pairs.
///
/// Records are inspected only as the sequence is advanced. Once drained it
/// stays empty; a new pass needs a fresh selection.
pub struct EligibleRecords<'a> {
    gate: ContentGate<'a>,
    records: vec::IntoIter<Record>,
    skipped: Vec<(String, SkipReason)>,
}

impl EligibleRecords<'_> {
    /// Advance to the next eligible record.
    pub async fn next(&mut self) -> Option<(Record, String)> {
        for record in self.records.by_ref() {
            match self.gate.admit(&record).await {
                Ok(text) => return Some((record, text)),
                Err(reason) => {
                    if reason.is_failure() {
                        warn!(record = %record.id, reason = %reason, "record skipped");
                    } else {
                        debug!(record = %record.id, reason = %reason, "record skipped");
                    }
                    self.skipped.push((record.id, reason));
                }
            }
        }
        None
    }

    /// Records rejected so far, with reasons.
    pub fn take_skipped(&mut self) -> Vec<(String, SkipReason)> {
        std::mem::take(&mut self.skipped)
    }
}
