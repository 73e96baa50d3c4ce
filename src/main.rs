use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use locsync::cache::LocaleCache;
use locsync::config::SyncConfig;
use locsync::engine::{StaticExtractor, SyncEngine};
use locsync::models::{ExtractedCall, KeyReference, NOT_TRANSLATED};

#[derive(Parser)]
#[command(
    name = "locsync",
    version,
    about = "Keeps JSON locale files in sync with the strings a source tree references",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "locsync.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configuration and the locale files it points at
    Validate,

    /// Show per-language translation coverage
    Status,

    /// Translate every word the primary language knows but others miss
    Fill,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Validate => {
            tracing::info!(config = %cli.config.display(), "Starting validate command");
            validate(&cli.config)?;
        }

        Commands::Status => {
            tracing::info!(config = %cli.config.display(), "Starting status command");
            status(&cli.config)?;
        }

        Commands::Fill => {
            tracing::info!(config = %cli.config.display(), "Starting fill command");
            fill(&cli.config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("locsync=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("locsync=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn validate(config_path: &PathBuf) -> Result<()> {
    let config = SyncConfig::load(config_path)?;
    let cache = LocaleCache::load(&config)?;

    let languages: Vec<&str> = config.languages.iter().map(|l| l.code.as_str()).collect();
    println!("Configuration is valid");
    println!("  Languages: {}", languages.join(", "));
    println!("  Primary: {}", config.primary_language);
    println!("  Provider: {}", config.translate_api.provider.as_str());
    println!("  Locale paths: {}", config.locale_paths.len());
    println!("  Namespaces: {}", cache.namespace_order().len());
    Ok(())
}

fn status(config_path: &PathBuf) -> Result<()> {
    let config = SyncConfig::load(config_path)?;
    let cache = LocaleCache::load(&config)?;

    println!("Translation status");
    for language in cache.languages() {
        let Some(content) = cache.language_content(language) else {
            continue;
        };
        let namespaces = content.len();
        let keys: usize = content.values().map(|words| words.len()).sum();
        let pending: usize = content
            .values()
            .flat_map(|words| words.values())
            .filter(|value| *value == NOT_TRANSLATED)
            .count();

        let marker = if *language == config.primary_language {
            " (primary)"
        } else {
            ""
        };
        println!("  {language}{marker}: {namespaces} namespaces, {keys} keys, {pending} pending");
    }
    Ok(())
}

/// Queue every primary-language key some other language is missing, run one
/// translation cycle and write the results back.
async fn fill(config_path: &PathBuf) -> Result<()> {
    let config = SyncConfig::load(config_path)?;
    let cache = LocaleCache::load(&config)?;
    let origin = config.locale_file(config.primary_locale_path(), &config.primary_language);

    // Reference set: everything the primary language currently defines, so
    // the merge pass keeps all of it
    let mut references = Vec::new();
    if let Some(content) = cache.language_content(&config.primary_language) {
        for (namespace, words) in content {
            for key in words.keys() {
                references.push(KeyReference::with_namespace(key.clone(), namespace.clone()));
            }
        }
    }

    let missing: Vec<KeyReference> = references
        .iter()
        .filter(|reference| {
            let namespace = config.resolve_namespace(reference.namespace.as_deref());
            cache.word_status(&reference.text, namespace).needs_translation()
        })
        .cloned()
        .collect();
    if missing.is_empty() {
        println!("Nothing to fill, every language is complete");
        return Ok(());
    }

    let extractor = Arc::new(StaticExtractor::new(references));
    let engine = SyncEngine::new(config, extractor)?;
    for reference in &missing {
        engine
            .report_call(
                ExtractedCall::Translate {
                    text: reference.text.clone(),
                    namespace: reference.namespace.clone(),
                },
                &origin,
            )
            .await?;
    }

    let queued = engine.queue_len().await;
    println!("Translating {queued} words...");
    engine.run_translation_cycle().await;
    engine.close_compile_window().await;
    let report = engine.run_merge_pass().await;
    println!("Updated {} locale files", report.files_written());
    Ok(())
}
