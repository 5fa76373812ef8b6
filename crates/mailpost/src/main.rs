//! `mailpost` - turns newsletters from an IMAP mailbox into posts.
//!
//! Subcommands:
//!
//! - `mailpost once` -- run one ingestion cycle.
//! - `mailpost run` -- run a cycle every `check_interval_minutes`.
//! - `mailpost check` -- log in, select the folder and report its size.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod sink;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailpost_core::{Ingestor, JsonFileLedger, Settings, TcpConnector, check_connection};

use sink::DirectorySink;

/// Lines of IMAP transcript kept for `once --transcript`.
const TRANSCRIPT_CAPACITY: usize = 500;

/// Newsletter ingestion from an IMAP mailbox.
#[derive(Parser)]
#[command(name = "mailpost", version, about)]
struct Cli {
    /// Settings file (defaults to `<config dir>/mailpost/settings.json`).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the ledger and written posts
    /// (defaults to `<data dir>/mailpost`).
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run a single ingestion cycle.
    Once {
        /// Print the IMAP transcript of the cycle.
        #[arg(long)]
        transcript: bool,
    },

    /// Run ingestion cycles on the configured interval until interrupted.
    Run,

    /// Test the mailbox connection.
    Check,
}

type FileIngestor = Ingestor<TcpConnector, JsonFileLedger, DirectorySink>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpost=info,mailpost_core=info,mailpost_imap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = config::load_settings(cli.config.as_deref()).await?;
    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);

    match cli.command {
        Command::Check => {
            let report = check_connection(&settings, &TcpConnector).await?;
            println!("{report}");
        }
        Command::Once { transcript } => {
            let mut ingestor = build_ingestor(settings, &data_dir);
            if transcript {
                ingestor = ingestor.with_transcript(TRANSCRIPT_CAPACITY);
            }
            let result = ingestor.run_cycle().await;
            if let Some(transcript) = ingestor.last_transcript() {
                print!("{transcript}");
            }
            println!("{}", result?);
        }
        Command::Run => run_forever(build_ingestor(settings, &data_dir)).await?,
    }

    Ok(())
}

fn build_ingestor(settings: Settings, data_dir: &Path) -> FileIngestor {
    let ledger = JsonFileLedger::new(data_dir.join("processed.json"));
    let sink = DirectorySink::new(data_dir.join("posts"), settings.notify_email.clone());
    info!(
        "ledger at {}, posts in {}",
        ledger.path().display(),
        sink.dir().display()
    );
    Ingestor::new(settings, TcpConnector, ledger, sink)
}

/// Runs cycles back to back on the interval; one cycle at a time.
async fn run_forever(mut ingestor: FileIngestor) -> anyhow::Result<()> {
    ingestor.settings().validate()?;

    let minutes = ingestor.settings().check_interval_minutes.max(1);
    let mut interval = tokio::time::interval(Duration::from_secs(minutes * 60));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("checking every {minutes} minute(s)");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = ingestor.run_cycle().await {
                    error!("cycle failed: {e}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping");
                return Ok(());
            }
        }
    }
}
