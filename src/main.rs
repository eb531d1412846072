//! altgen binary entry point

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use altgen::config::ApiKeys;
use altgen::providers::HttpProviderClient;
use altgen::services::{JsonAssetTable, JsonPropertyStore};
use altgen::{BatchOptions, ProviderId, Session, StopReason};

#[derive(Parser)]
#[command(name = "altgen")]
#[command(about = "Generates replacement text alternatives for low-performing ad assets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a generation batch over the asset table
    Run {
        /// LLM provider: groq, googleai or openrouter
        #[arg(long)]
        provider: ProviderId,

        /// Model identifier, e.g. gemma2-9b-it or gemini-1.5-flash
        #[arg(long)]
        model: String,

        /// Path to the asset table JSON file
        #[arg(long)]
        table: PathBuf,

        /// Path to the persistent property store
        #[arg(long, default_value = "altgen_state.json")]
        state: PathBuf,

        /// First sheet row to process (data starts at row 3)
        #[arg(long)]
        start_row: Option<u32>,

        /// Keep existing alternatives and resume from the first unfilled row
        #[arg(long)]
        keep_existing: bool,
    },
    /// Signal a running batch to stop at its next checkpoint
    Stop {
        /// Path to the persistent property store
        #[arg(long, default_value = "altgen_state.json")]
        state: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            provider,
            model,
            table,
            state,
            start_row,
            keep_existing,
        } => {
            let keys = ApiKeys::from_env();
            if !keys.has_plausible_key(provider) {
                bail!(
                    "no usable API key for {provider}; set {} in the environment or .env",
                    ApiKeys::env_key(provider)
                );
            }

            let store = Arc::new(JsonPropertyStore::new(&state));
            let client = HttpProviderClient::new(keys);
            let mut table = JsonAssetTable::open(&table)
                .await
                .context("failed to open asset table")?;

            let session = Session::new(store);
            let report = session
                .start_batch(
                    &mut table,
                    &client,
                    BatchOptions {
                        provider,
                        model,
                        start_row,
                        reset_existing: !keep_existing,
                    },
                )
                .await?;

            println!(
                "Batch {}: {} rows processed, {} alternatives written, {} slots cleared.",
                report.batch_id,
                report.rows_processed,
                report.slots_written,
                report.slots_cleared
            );
            match report.stopped {
                None => println!("Generation complete."),
                Some(StopReason::Cancelled) => println!("Stopped by user."),
                Some(reason) => {
                    println!("Aborted: {reason}");
                    std::process::exit(1);
                }
            }
        }
        Command::Stop { state } => {
            let store = Arc::new(JsonPropertyStore::new(&state));
            Session::new(store).cancel_batch().await?;
            println!("Stop requested; the running batch will halt at its next checkpoint.");
        }
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("altgen=info,reqwest=warn")),
        )
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
