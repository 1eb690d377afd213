//! bibenrich CLI.
//!
//! Runs the abstract or tagging flow over records in a JSON library file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use bibenrich::config::{
    self, ConfigResolver, ConfigSource, EnrichConfig, InteractivePrompt, PreferenceStore,
    RunSettings, StaticDefault, TomlPreferenceStore,
};
use bibenrich::library::{JsonLibrary, Library};
use bibenrich::logging;
use bibenrich::pipeline::{AbstractPipeline, TaggingPipeline};
use bibenrich::prompts::PromptBuilder;
use bibenrich::providers::openai::OpenAiProvider;
use bibenrich::providers::LlmProvider;

/// Enrich bibliographic records with LLM-generated abstracts and subject tags.
#[derive(Debug, Parser)]
#[command(name = "bibenrich", version, about)]
struct Cli {
    /// Library file holding records and attachments.
    #[arg(long, default_value = "library.json")]
    library: PathBuf,

    /// Preference file (default: ~/.bibenrich/prefs.toml).
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Optional TOML file overriding run settings.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Also write JSON logs to this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Never prompt; missing preferences fall back to their defaults.
    #[arg(long)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate abstracts for records that have a PDF but no abstract.
    Abstracts {
        /// Record ids to process, in order (default: all records).
        ids: Vec<String>,
    },
    /// Classify records into subject tags.
    Tag {
        /// Record ids to process, in order (default: all records).
        ids: Vec<String>,
    },
    /// Forget persisted API key, endpoint and model.
    ResetConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let _guard = match &cli.log_dir {
        Some(dir) => Some(logging::init_with_file(dir)?),
        None => {
            logging::init_cli();
            None
        }
    };

    let prefs_path = match &cli.prefs {
        Some(path) => path.clone(),
        None => config::default_prefs_path()?,
    };
    let store: Arc<dyn PreferenceStore> = Arc::new(TomlPreferenceStore::new(prefs_path));
    let fallback: Box<dyn ConfigSource> = if cli.non_interactive {
        Box::new(StaticDefault)
    } else {
        Box::new(InteractivePrompt::stdio())
    };
    let resolver = ConfigResolver::new(store, fallback);

    let ids = match cli.command {
        Command::ResetConfig => {
            resolver.clear().context("failed to clear preferences")?;
            info!("preferences cleared");
            return Ok(());
        }
        Command::Abstracts { ref ids } | Command::Tag { ref ids } => ids.clone(),
    };

    let api = EnrichConfig::resolve(&resolver).context("configuration is incomplete")?;
    let settings = match &cli.settings {
        Some(path) => config::load_settings(path)?,
        None => RunSettings::default(),
    };
    info!(endpoint = %api.api_endpoint, model = %api.model, "configuration resolved");

    let provider: Arc<dyn LlmProvider> = Arc::new(
        OpenAiProvider::from_config(&api, settings.request_timeout())
            .context("failed to build HTTP client")?,
    );
    let json_library = Arc::new(
        JsonLibrary::open(&cli.library)
            .await
            .with_context(|| format!("failed to open library {}", cli.library.display()))?,
    );
    let records = json_library
        .select(&ids)
        .context("failed to resolve selection")?;
    let library: Arc<dyn Library> = json_library;
    let prompts = PromptBuilder::from_settings(&api, &settings);

    match cli.command {
        Command::Abstracts { .. } => {
            AbstractPipeline::new(library, provider, prompts, &settings)
                .run(records)
                .await;
        }
        Command::Tag { .. } => {
            TaggingPipeline::new(library, provider, prompts)
                .run(records)
                .await;
        }
        Command::ResetConfig => {}
    }

    Ok(())
}
