//! Prompt construction for abstract generation and subject classification.
//!
//! Pure: builds [`CompletionRequest`]s, touches neither network nor host.

use crate::config::{EnrichConfig, RunSettings};
use crate::providers::{CompletionRequest, Message};
use crate::vocabulary::TagVocabulary;

/// System message for abstract generation.
pub const ABSTRACT_SYSTEM_PROMPT: &str =
    "You are an AI assistant that writes detailed abstracts for academic content.";

/// System message for classification.
pub const CLASSIFIER_SYSTEM_PROMPT: &str =
    "You are an assistant that classifies bibliographic items into subject tags.";

const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TAG_PREFIX: &str = "Bib:";

/// Builds completion requests for one model.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    model: String,
    max_tokens: u32,
    tag_prefix: String,
    vocabulary: TagVocabulary,
}

impl PromptBuilder {
    /// Builder with the built-in vocabulary, `Bib:` prefix and 1000-token budget.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            tag_prefix: DEFAULT_TAG_PREFIX.to_owned(),
            vocabulary: TagVocabulary::builtin(),
        }
    }

    /// Builder from resolved configuration and run settings.
    pub fn from_settings(config: &EnrichConfig, settings: &RunSettings) -> Self {
        Self::new(config.model.clone())
            .with_max_tokens(settings.max_tokens)
            .with_tag_prefix(settings.tag_prefix.clone())
    }

    /// Override the output token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the tag namespace marker.
    #[must_use]
    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }

    /// Override the allowed-tag vocabulary.
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: TagVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Request an abstract for extracted document text.
    pub fn abstract_request(&self, source_text: &str) -> CompletionRequest {
        self.request(
            ABSTRACT_SYSTEM_PROMPT,
            format!("Write a detailed abstract for the following content:\n\n{source_text}"),
        )
    }

    /// Request subject tags for a record.
    ///
    /// Returns `None` when title and abstract are both empty; such records
    /// are skipped without calling the API.
    pub fn classification_request(
        &self,
        title: &str,
        abstract_note: &str,
    ) -> Option<CompletionRequest> {
        let text = classification_input(title, abstract_note)?;
        let prefix = &self.tag_prefix;
        let allowed = self.vocabulary.render();
        let prompt = format!(
            "Given the following text extracted from a bibliographic item:\n\
             \n\
             ---------------------\n\
             {text}\n\
             ---------------------\n\
             \n\
             Return only a JSON array containing the appropriate subject tags that best reflect the subject matter of the item.\n\
             Each tag must be one of the following allowed tags but with \"{prefix}\" prepended to it.\n\
             Allowed tags:\n\
             {allowed}\n\
             \n\
             Format your reply as a markdown code block with valid JSON."
        );
        Some(self.request(CLASSIFIER_SYSTEM_PROMPT, prompt))
    }

    fn request(&self, system: &str, user: String) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::system(system), Message::user(user)],
            max_tokens: self.max_tokens,
        }
    }
}

/// Classification input: `title + "\n\n" + abstract`, trimmed. `None` when blank.
pub fn classification_input(title: &str, abstract_note: &str) -> Option<String> {
    let text = format!("{title}\n\n{abstract_note}");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_owned())
}
