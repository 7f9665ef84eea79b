use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use vitae_core::{EntityKind, Source};
use vitae_reconcile::{Admission, DuplicateGuard, Reconciler, ServiceConfig};
use vitae_storage::{PgStore, ProfileStore};

#[derive(Debug, Parser)]
#[command(name = "vitae-cli")]
#[command(about = "Vitae profile reconciliation command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Resume,
    User,
}

impl From<SourceArg> for Source {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Resume => Source::Resume,
            SourceArg::User => Source::User,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply database migrations.
    Migrate,
    /// Check a resume file against the duplicate registry and record it.
    Admit { file: PathBuf },
    /// Reconcile a structured-draft JSON file into a user's profile.
    Reconcile {
        user_id: String,
        draft: PathBuf,
        #[arg(long, value_enum, default_value_t = SourceArg::Resume)]
        source: SourceArg,
    },
    /// Print a user's stored profile as JSON.
    Show { user_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env();
    let store = Arc::new(
        PgStore::connect(&config.database_url, config.max_connections)
            .await
            .with_context(|| format!("connecting to {}", config.database_url))?,
    );

    match cli.command {
        Commands::Migrate => {
            store.migrate().await.context("applying migrations")?;
            println!("migrations applied");
        }
        Commands::Admit { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string());

            let guard = DuplicateGuard::new(store);
            match guard.admit(&bytes, &filename).await? {
                Admission::Accepted(record) => {
                    println!("admitted: hash={} filename={}", record.file_hash, record.filename);
                }
                Admission::DuplicateRejected { file_hash, existing } => {
                    let original = existing
                        .map(|r| r.filename)
                        .unwrap_or_else(|| "unknown".to_string());
                    println!("duplicate: hash={file_hash} first seen as {original}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Reconcile { user_id, draft, source } => {
            let text = std::fs::read_to_string(&draft)
                .with_context(|| format!("reading {}", draft.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", draft.display()))?;

            let reconciler = Reconciler::new(store);
            let summary = reconciler
                .reconcile_json(&user_id, value, source.into())
                .await?;
            println!(
                "reconcile complete: op_id={} entities={} created={} applied={} skipped={} failed={}",
                summary.op_id,
                summary.outcomes.len(),
                summary.count(vitae_core::MergeOutcome::Created),
                summary.count(vitae_core::MergeOutcome::Applied),
                summary.count(vitae_core::MergeOutcome::SkippedPriorityHeld),
                summary.count(vitae_core::MergeOutcome::Failed),
            );
        }
        Commands::Show { user_id } => {
            let profile = store
                .root_document(&user_id)
                .await?
                .with_context(|| format!("no profile stored for {user_id}"))?;

            let mut output = serde_json::json!({ "profile": profile });
            for kind in [
                EntityKind::Skill,
                EntityKind::Project,
                EntityKind::Experience,
                EntityKind::Education,
            ] {
                let records = store.entities(&user_id, kind).await?;
                output[kind.as_str()] = serde_json::to_value(records)?;
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
