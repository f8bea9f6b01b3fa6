//! CLI command definitions and handlers

use anyhow::Context;
use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::core::client::ModernMtTranslator;
use crate::core::config::ProviderConfig;
use crate::core::credentials::EnvKeyRepository;
use crate::processors::job::{InMemoryJob, JobProcessor, JobState};

/// Commands for the ModernMT connector
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the configured API key is accepted by ModernMT
    Check,

    /// Translate a job described in a JSON file
    Translate {
        /// Job file (required)
        #[arg(short, long)]
        job: PathBuf,

        /// Where to write the processed job (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective provider configuration
    Config,
}

fn build_translator(config: ProviderConfig) -> anyhow::Result<ModernMtTranslator> {
    let keys = Arc::new(EnvKeyRepository::default());
    Ok(ModernMtTranslator::from_config(config, keys)?)
}

/// Handle availability check command
pub async fn handle_check(config: ProviderConfig) -> anyhow::Result<()> {
    let translator = build_translator(config)?;
    let availability = translator.check_available().await;

    if !availability.is_available() {
        anyhow::bail!("{}", availability);
    }

    println!("✅ {}", availability);
    Ok(())
}

/// Handle job translation command
pub async fn handle_translate(
    config: ProviderConfig,
    job_path: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&job_path)
        .await
        .with_context(|| format!("Failed to read job file {}", job_path.display()))?;
    let mut job: InMemoryJob = serde_json::from_str(&content)
        .with_context(|| format!("Invalid job file {}", job_path.display()))?;

    info!("Input: {}", job_path.display());
    info!("Items: {}", job.items.len());

    let processor = JobProcessor::new(build_translator(config)?);
    let report = processor.request_translation(&mut job).await;

    let rendered = serde_json::to_string_pretty(&job)?;
    match &output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Output: {}", path.display());
        }
        None => println!("{}", rendered),
    }

    let status = if job.state == JobState::Rejected {
        "❌ Translation job rejected"
    } else {
        "✅ Translation job submitted"
    };
    eprintln!("\n{}", status);
    eprintln!("   Items: {}", report.items);
    eprintln!("   Fields: {}", report.fields);
    eprintln!("   Translated: {}", report.translated);
    eprintln!("   Malformed: {}", report.malformed);
    eprintln!("   Failed: {}", report.failed);

    Ok(())
}

/// Handle configuration display command
pub async fn handle_config(config: ProviderConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
