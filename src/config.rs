//! Configuration resolution and run settings.
//!
//! API credentials are resolved once at start by a [`ConfigResolver`]:
//! the persisted value wins, otherwise a fallback [`ConfigSource`] is asked
//! (an interactive prompt or the static default). Answers from the fallback
//! are written back through the [`PreferenceStore`] so later runs reuse them.
//!
//! Precedence for [`EnrichConfig`]: env vars > persisted preferences > fallback.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

/// Namespace prefixed to every persisted preference key.
pub const PREF_NAMESPACE: &str = "extensions.zotero.abstractGen";

/// Preference name for the API key.
pub const KEY_API_KEY: &str = "apiKey";
/// Preference name for the completion endpoint.
pub const KEY_API_ENDPOINT: &str = "apiEndpoint";
/// Preference name for the model identifier.
pub const KEY_MODEL: &str = "aiModel";

/// Endpoint offered when none is persisted.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
/// Model offered when none is persisted.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-2024-07-18";

const ENV_API_KEY: &str = "BIBENRICH_API_KEY";
const ENV_API_ENDPOINT: &str = "BIBENRICH_API_ENDPOINT";
const ENV_MODEL: &str = "BIBENRICH_MODEL";

/// Fully-qualified preference key for a short name.
pub fn pref_key(name: &str) -> String {
    format!("{PREF_NAMESPACE}.{name}")
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Configuration failures. All of them abort the run before any item is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No value was persisted and none was supplied when asked.
    #[error("{key} is required to run")]
    ConfigurationMissing {
        /// Short preference name (e.g. `apiKey`).
        key: String,
    },
    /// The preference store could not be read or written.
    #[error("preference store error: {0}")]
    Store(String),
    /// Reading the answer to a prompt failed.
    #[error("failed to read prompt answer: {0}")]
    Prompt(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Preference store (load/store boundary)
// ---------------------------------------------------------------------------

/// Persistent key-value preferences.
pub trait PreferenceStore: Send + Sync {
    /// Read a value by fully-qualified key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Store` if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError>;

    /// Persist a value by fully-qualified key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Store` if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError>;

    /// Remove a value. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Store` if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), ConfigError>;
}

/// In-process preference store.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferenceStore {
    /// Create a store pre-populated with `(key, value)` pairs.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: Mutex::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, ConfigError> {
        self.values
            .lock()
            .map_err(|_| ConfigError::Store("preference lock poisoned".to_owned()))
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.lock()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Preference store backed by a flat TOML table on disk.
///
/// The file is re-read on every access; it holds a handful of keys.
#[derive(Debug, Clone)]
pub struct TomlPreferenceStore {
    path: PathBuf,
}

impl TomlPreferenceStore {
    /// Open (lazily) the store at `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| {
                ConfigError::Store(format!(
                    "failed to parse preferences at {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(ConfigError::Store(format!(
                "failed to read preferences at {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Store(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let contents = toml::to_string(values)
            .map_err(|e| ConfigError::Store(format!("failed to encode preferences: {e}")))?;
        std::fs::write(&self.path, contents).map_err(|e| {
            ConfigError::Store(format!(
                "failed to write preferences at {}: {e}",
                self.path.display()
            ))
        })?;
        restrict_permissions(&self.path)
    }
}

impl PreferenceStore for TomlPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut values = self.load()?;
        values.insert(key.to_owned(), value.to_owned());
        self.write(&values)
    }

    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.write(&values)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|e| {
        ConfigError::Store(format!(
            "failed to set permissions on {}: {e}",
            path.display()
        ))
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

/// Resolve the default config directory (`~/.bibenrich/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".bibenrich"))
}

/// Default preference file (`~/.bibenrich/prefs.toml`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_prefs_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("prefs.toml"))
}

// ---------------------------------------------------------------------------
// Config sources
// ---------------------------------------------------------------------------

/// Something that can supply a configuration value by short name.
pub trait ConfigSource: Send + Sync {
    /// Look up `key`. `prompt` and `default` are offered to sources that ask.
    ///
    /// `Ok(None)` means the source declined to answer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the source itself failed.
    fn lookup(&self, key: &str, prompt: &str, default: &str)
        -> Result<Option<String>, ConfigError>;
}

/// Reads previously persisted values.
pub struct PersistedValue {
    store: Arc<dyn PreferenceStore>,
}

impl PersistedValue {
    /// Wrap a preference store.
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }
}

impl ConfigSource for PersistedValue {
    fn lookup(
        &self,
        key: &str,
        _prompt: &str,
        _default: &str,
    ) -> Result<Option<String>, ConfigError> {
        Ok(self
            .store
            .get(&pref_key(key))?
            .filter(|value| !value.trim().is_empty()))
    }
}

/// Asks the user on a line-oriented terminal.
///
/// An empty answer accepts the default; end of input declines.
pub struct InteractivePrompt<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl<R, W> InteractivePrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    /// Prompt on `output`, read answers from `input`.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }
}

impl InteractivePrompt<std::io::BufReader<std::io::Stdin>, std::io::Stderr> {
    /// Prompt on stderr, read answers from stdin.
    pub fn stdio() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl<R, W> ConfigSource for InteractivePrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn lookup(&self, key: &str, prompt: &str, default: &str) -> Result<Option<String>, ConfigError> {
        {
            let mut output = self
                .output
                .lock()
                .map_err(|_| ConfigError::Store("prompt output lock poisoned".to_owned()))?;
            if default.is_empty() {
                write!(output, "{prompt} ")?;
            } else {
                write!(output, "{prompt} [{default}] ")?;
            }
            output.flush()?;
        }

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .map_err(|_| ConfigError::Store("prompt input lock poisoned".to_owned()))?
            .read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }

        let answer = line.trim();
        if answer.is_empty() {
            return StaticDefault.lookup(key, prompt, default);
        }
        Ok(Some(answer.to_owned()))
    }
}

/// Answers with the default without asking. Declines when the default is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDefault;

impl ConfigSource for StaticDefault {
    fn lookup(
        &self,
        _key: &str,
        _prompt: &str,
        default: &str,
    ) -> Result<Option<String>, ConfigError> {
        if default.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(default.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Persisted-then-fallback resolution with persist-on-first-use.
pub struct ConfigResolver {
    store: Arc<dyn PreferenceStore>,
    persisted: PersistedValue,
    fallback: Box<dyn ConfigSource>,
}

impl ConfigResolver {
    /// Build a resolver over `store`, asking `fallback` for anything missing.
    pub fn new(store: Arc<dyn PreferenceStore>, fallback: Box<dyn ConfigSource>) -> Self {
        Self {
            persisted: PersistedValue::new(Arc::clone(&store)),
            store,
            fallback,
        }
    }

    /// Resolve one value by short name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigurationMissing` when nothing is persisted
    /// and the fallback declines or answers with an empty value.
    pub fn resolve(&self, key: &str, prompt: &str, default: &str) -> Result<String, ConfigError> {
        if let Some(value) = self.persisted.lookup(key, prompt, default)? {
            debug!(key, "using persisted preference");
            return Ok(value);
        }

        match self.fallback.lookup(key, prompt, default)? {
            Some(value) if !value.trim().is_empty() => {
                let value = value.trim().to_owned();
                self.store.set(&pref_key(key), &value)?;
                info!(key, "saved to preferences");
                Ok(value)
            }
            _ => Err(ConfigError::ConfigurationMissing {
                key: key.to_owned(),
            }),
        }
    }

    /// Remove every persisted API preference so the next run asks again.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Store` if the store cannot be written.
    pub fn clear(&self) -> Result<(), ConfigError> {
        for key in [KEY_API_KEY, KEY_API_ENDPOINT, KEY_MODEL] {
            self.store.remove(&pref_key(key))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// API configuration, resolved once and passed to the client and prompt builder.
#[derive(Clone, PartialEq, Eq)]
pub struct EnrichConfig {
    /// Bearer token for the completion endpoint.
    pub api_key: String,
    /// Completion endpoint URL.
    pub api_endpoint: String,
    /// Model identifier.
    pub model: String,
}

impl std::fmt::Debug for EnrichConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_endpoint", &self.api_endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl EnrichConfig {
    /// Resolve all three values, honouring `BIBENRICH_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered; nothing after it is asked.
    pub fn resolve(resolver: &ConfigResolver) -> Result<Self, ConfigError> {
        Self::resolve_with(resolver, |key| std::env::var(key).ok())
    }

    /// Resolve using a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn resolve_with(
        resolver: &ConfigResolver,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |var: &str, key: &str, prompt: &str, default: &str| {
            match env(var).filter(|v| !v.trim().is_empty()) {
                Some(value) => Ok(value),
                None => resolver.resolve(key, prompt, default),
            }
        };

        Ok(Self {
            api_key: lookup(
                ENV_API_KEY,
                KEY_API_KEY,
                "Please enter your OpenAI API Key:",
                "",
            )?,
            api_endpoint: lookup(
                ENV_API_ENDPOINT,
                KEY_API_ENDPOINT,
                "Please enter your AI provider's endpoint:",
                DEFAULT_API_ENDPOINT,
            )?,
            model: lookup(
                ENV_MODEL,
                KEY_MODEL,
                "Please enter your preferred AI model:",
                DEFAULT_MODEL,
            )?,
        })
    }
}

// ---------------------------------------------------------------------------
// Run settings
// ---------------------------------------------------------------------------

/// Tunables for a batch run. Loaded from an optional TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunSettings {
    /// Pause after each completed abstract, in milliseconds.
    #[serde(default = "default_abstract_delay_ms")]
    pub abstract_delay_ms: u64,

    /// Output token budget per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// The only attachment content type the abstract flow reads.
    #[serde(default = "default_content_type")]
    pub supported_content_type: String,

    /// Namespace marker the model is told to prepend to every tag.
    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,

    /// HTTP timeout per completion call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            abstract_delay_ms: default_abstract_delay_ms(),
            max_tokens: default_max_tokens(),
            supported_content_type: default_content_type(),
            tag_prefix: default_tag_prefix(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RunSettings {
    /// Delay between abstract-flow records.
    pub fn abstract_delay(&self) -> Duration {
        Duration::from_millis(self.abstract_delay_ms)
    }

    /// Per-call HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Default value functions for serde

fn default_abstract_delay_ms() -> u64 {
    1000
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_content_type() -> String {
    "application/pdf".to_owned()
}
fn default_tag_prefix() -> String {
    "Bib:".to_owned()
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// Load run settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_settings(path: &Path) -> anyhow::Result<RunSettings> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read settings at {}: {e}", path.display()))?;
    let settings: RunSettings = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse settings at {}: {e}", path.display()))?;
    Ok(settings)
}
