use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use seaside::cli::{Cli, Command};
use seaside::config::SeasideConfig;
use seaside::jobs::{JobRegistry, PollStatus};
use seaside::orchestrator::{JobOrchestrator, TranslationRequest};
use seaside::pipeline::{ContentKind, Document, batches, decode_source};
use seaside::ui::JobProgress;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Progress lines are already rendered by the UI, so the default filter
/// only lets warnings through. `RUST_LOG` wins when set.
fn init_tracing(verbose: bool) {
    let default = if verbose { "seaside=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => SeasideConfig::load_from(path)?,
        None => SeasideConfig::load()?,
    };

    match cli.command {
        Command::Translate {
            file,
            job_id,
            api_key,
            batch_size,
            workers,
        } => {
            if let Some(n) = batch_size {
                config.batch_size = n;
            }
            if let Some(n) = workers {
                config.max_workers = n;
            }
            config.validate()?;

            let registry = Arc::new(JobRegistry::new());
            let orchestrator = JobOrchestrator::deepseek(Arc::clone(&registry), config);
            let id = orchestrator.submit(TranslationRequest {
                job_id,
                source: file,
                api_key,
            })?;

            let progress = JobProgress::start(&id);
            let snapshot = progress.watch(&registry, &id).await;
            progress.complete(&snapshot);

            Ok(if snapshot.status == PollStatus::Done {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Split { file, batch_size } => {
            if let Some(n) = batch_size {
                config.batch_size = n;
            }
            config.validate()?;

            let bytes = std::fs::read(&file)
                .with_context(|| format!("cannot read source file {}", file.display()))?;
            let kind = ContentKind::from_path(&file);
            let document = Document::split(&decode_source(&bytes), kind);
            let unit = match kind {
                ContentKind::Subtitle => "cues",
                ContentKind::PlainText => "lines",
            };
            println!("{}: {} {unit}", file.display(), document.len());

            let plan = batches(document.into_blocks(), config.batch_size()?);
            println!(
                "{} batches of up to {} {unit}",
                plan.len(),
                config.batch_size
            );
            for batch in &plan {
                println!(
                    "  batch {:>3}: {:>3} {unit}, {} bytes",
                    batch.index,
                    batch.blocks.len(),
                    batch.text().len()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
