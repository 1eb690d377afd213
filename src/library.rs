//! Host document-management boundary.
//!
//! The pipelines only see the [`Library`] trait: attachment lookup, extracted
//! text, and the two save flavours. [`MemoryLibrary`] backs tests and embedding;
//! [`JsonLibrary`] backs the CLI with a single JSON file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Record field holding the title.
pub const FIELD_TITLE: &str = "title";
/// Record field holding the abstract.
pub const FIELD_ABSTRACT: &str = "abstractNote";

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// Kind of library item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A regular bibliographic item.
    #[default]
    Regular,
    /// A standalone note.
    Note,
    /// A standalone attachment.
    Attachment,
}

/// A bibliographic item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Host identifier.
    pub id: String,
    /// Item kind. Only regular items get abstracts.
    #[serde(default)]
    pub kind: ItemKind,
    /// Title field.
    #[serde(default)]
    pub title: String,
    /// Abstract field; empty when missing.
    #[serde(default)]
    pub abstract_note: String,
    /// Attachment identifiers, in host order.
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl Record {
    /// A regular record with no fields set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Regular,
            title: String::new(),
            abstract_note: String::new(),
            attachments: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Set the kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the abstract.
    #[must_use]
    pub fn with_abstract(mut self, abstract_note: impl Into<String>) -> Self {
        self.abstract_note = abstract_note.into();
        self
    }

    /// Append an attachment identifier.
    #[must_use]
    pub fn with_attachment(mut self, attachment_id: impl Into<String>) -> Self {
        self.attachments.push(attachment_id.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.add_tag(tag);
        self
    }

    /// Whether this is a regular bibliographic item.
    pub fn is_regular(&self) -> bool {
        self.kind == ItemKind::Regular
    }

    /// Read a named field. Unknown names yield `None`.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            FIELD_TITLE => Some(&self.title),
            FIELD_ABSTRACT => Some(&self.abstract_note),
            _ => None,
        }
    }

    /// Write a named field.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::UnknownField` for names other than `title`
    /// and `abstractNote`.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), LibraryError> {
        match name {
            FIELD_TITLE => self.title = value.into(),
            FIELD_ABSTRACT => self.abstract_note = value.into(),
            other => return Err(LibraryError::UnknownField(other.to_owned())),
        }
        Ok(())
    }

    /// Add a tag unless already present. Returns whether it was added.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Tags in insertion order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether the record carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A file linked to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Host identifier.
    pub id: String,
    /// MIME content type.
    pub content_type: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Text already extracted by the host, if any.
    #[serde(default)]
    pub text: Option<String>,
}

impl Attachment {
    /// A PDF attachment with the given extracted text.
    pub fn pdf(id: impl Into<String>, text: Option<&str>) -> Self {
        Self {
            id: id.into(),
            content_type: "application/pdf".to_owned(),
            title: String::new(),
            text: text.map(str::to_owned),
        }
    }
}

/// Which save flavour persisted a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// `save_tx`: transactional save.
    Transactional,
    /// `save`: simple save.
    Simple,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Host access failures.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// No record or attachment with this id.
    #[error("library item not found: {0}")]
    NotFound(String),
    /// Field name the host does not know.
    #[error("unknown field: {0}")]
    UnknownField(String),
    /// Backing file could not be read or written.
    #[error("library I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Backing file is not valid library JSON.
    #[error("library file is malformed: {0}")]
    Serde(#[from] serde_json::Error),
    /// The host refused the write.
    #[error("save rejected: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Operations the pipelines need from the host.
#[async_trait]
pub trait Library: Send + Sync {
    /// Fetch attachment metadata.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::NotFound` when the id is unknown.
    async fn attachment(&self, id: &str) -> Result<Attachment, LibraryError>;

    /// Fetch an attachment's extracted text. `None` when nothing was extracted.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] when the text cannot be accessed.
    async fn attachment_text(&self, id: &str) -> Result<Option<String>, LibraryError>;

    /// Persist a record inside a host transaction.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] when the write fails.
    async fn save_tx(&self, record: &Record) -> Result<(), LibraryError>;

    /// Persist a record without a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] when the write fails.
    async fn save(&self, record: &Record) -> Result<(), LibraryError>;
}

// ---------------------------------------------------------------------------
// In-memory host
// ---------------------------------------------------------------------------

/// On-disk and in-memory layout of a library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryData {
    /// All records, in selection order.
    #[serde(default)]
    pub records: Vec<Record>,
    /// All attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Default)]
struct MemoryState {
    data: LibraryData,
    saves: Vec<(String, SaveMode)>,
}

/// In-process library.
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    state: Mutex<MemoryState>,
}

impl MemoryLibrary {
    /// Build a library from records and attachments.
    pub fn new(records: Vec<Record>, attachments: Vec<Attachment>) -> Self {
        Self::from_data(LibraryData {
            records,
            attachments,
        })
    }

    /// Build a library from a loaded data set.
    pub fn from_data(data: LibraryData) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                data,
                ..MemoryState::default()
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, LibraryError> {
        self.state
            .lock()
            .map_err(|_| LibraryError::Rejected("library lock poisoned".to_owned()))
    }

    /// Records for a selection, in the requested order.
    ///
    /// An empty selection returns every record in stored order. Repeated ids
    /// are kept at their first position only, so each record is visited once
    /// per run.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::NotFound` for the first unknown id.
    pub fn select(&self, ids: &[String]) -> Result<Vec<Record>, LibraryError> {
        let state = self.lock()?;
        if ids.is_empty() {
            return Ok(state.data.records.clone());
        }
        let mut seen = HashSet::new();
        ids.iter()
            .filter(|id| seen.insert(*id))
            .map(|id| {
                state
                    .data
                    .records
                    .iter()
                    .find(|r| &r.id == id)
                    .cloned()
                    .ok_or_else(|| LibraryError::NotFound(id.clone()))
            })
            .collect()
    }

    /// Current stored copy of a record.
    pub fn record(&self, id: &str) -> Option<Record> {
        self.lock()
            .ok()?
            .data
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Every successful save so far, in order.
    pub fn saves(&self) -> Vec<(String, SaveMode)> {
        self.lock().map(|s| s.saves.clone()).unwrap_or_default()
    }

    /// Snapshot of the full data set.
    pub fn snapshot(&self) -> Result<LibraryData, LibraryError> {
        Ok(self.lock()?.data.clone())
    }

    /// Data set as it would look after saving `record`; nothing is stored.
    fn staged(&self, record: &Record) -> Result<LibraryData, LibraryError> {
        let mut data = self.snapshot()?;
        replace_record(&mut data, record)?;
        Ok(data)
    }

    fn store(&self, record: &Record, mode: SaveMode) -> Result<(), LibraryError> {
        let mut state = self.lock()?;
        replace_record(&mut state.data, record)?;
        state.saves.push((record.id.clone(), mode));
        Ok(())
    }
}

fn replace_record(data: &mut LibraryData, record: &Record) -> Result<(), LibraryError> {
    let slot = data
        .records
        .iter_mut()
        .find(|r| r.id == record.id)
        .ok_or_else(|| LibraryError::NotFound(record.id.clone()))?;
    *slot = record.clone();
    Ok(())
}

#[async_trait]
impl Library for MemoryLibrary {
    async fn attachment(&self, id: &str) -> Result<Attachment, LibraryError> {
        self.lock()?
            .data
            .attachments
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound(id.to_owned()))
    }

    async fn attachment_text(&self, id: &str) -> Result<Option<String>, LibraryError> {
        Ok(self.attachment(id).await?.text)
    }

    async fn save_tx(&self, record: &Record) -> Result<(), LibraryError> {
        self.store(record, SaveMode::Transactional)
    }

    async fn save(&self, record: &Record) -> Result<(), LibraryError> {
        self.store(record, SaveMode::Simple)
    }
}

// ---------------------------------------------------------------------------
// JSON-file host
// ---------------------------------------------------------------------------

/// Library persisted as one JSON file.
///
/// Every save rewrites the whole file through a temp-file rename, so both
/// save flavours are atomic. The in-memory copy only changes once the file
/// has been replaced; a failed save leaves both untouched.
#[derive(Debug)]
pub struct JsonLibrary {
    path: PathBuf,
    inner: MemoryLibrary,
    writer: tokio::sync::Mutex<()>,
}

impl JsonLibrary {
    /// Load a library file.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] if the file cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let path = path.into();
        let contents = tokio::fs::read_to_string(&path).await?;
        let data: LibraryData = serde_json::from_str(&contents)?;
        debug!(
            path = %path.display(),
            records = data.records.len(),
            attachments = data.attachments.len(),
            "library loaded"
        );
        Ok(Self {
            path,
            inner: MemoryLibrary::from_data(data),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records for a selection; see [`MemoryLibrary::select`].
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::NotFound` for the first unknown id.
    pub fn select(&self, ids: &[String]) -> Result<Vec<Record>, LibraryError> {
        self.inner.select(ids)
    }

    async fn commit(&self, record: &Record, mode: SaveMode) -> Result<(), LibraryError> {
        let _writer = self.writer.lock().await;
        let candidate = self.inner.staged(record)?;
        self.write_file(&candidate).await?;
        self.inner.store(record, mode)
    }

    async fn write_file(&self, data: &LibraryData) -> Result<(), LibraryError> {
        let encoded = serde_json::to_vec_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, encoded).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Library for JsonLibrary {
    async fn attachment(&self, id: &str) -> Result<Attachment, LibraryError> {
        self.inner.attachment(id).await
    }

    async fn attachment_text(&self, id: &str) -> Result<Option<String>, LibraryError> {
        self.inner.attachment_text(id).await
    }

    async fn save_tx(&self, record: &Record) -> Result<(), LibraryError> {
        self.commit(record, SaveMode::Transactional).await
    }

    async fn save(&self, record: &Record) -> Result<(), LibraryError> {
        self.commit(record, SaveMode::Simple).await
    }
}
