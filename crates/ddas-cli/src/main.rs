//! # ddas CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Backends are configured from the same environment variables as the
//! HTTP server (`DATABASE_URL`, `DDAS_STORE_BACKEND`, ...).

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ddas_archive::{build_archiver, ArchiveConfig, Archiver, Deadline};
use ddas_cli::archive::{run_archive, ArchiveArgs};
use ddas_cli::fingerprint::{run_fingerprint, FingerprintArgs};
use ddas_cli::query::{run_check, run_fetch, run_list, CheckArgs, FetchArgs, ListArgs};

/// Content-addressed archive engine.
///
/// Fingerprints content with SHA-256, stores each owner's first copy and
/// reports every later upload of the same bytes as a duplicate.
#[derive(Parser, Debug)]
#[command(name = "ddas", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the SHA-256 fingerprint of local files.
    Fingerprint(FingerprintArgs),

    /// Archive a file for an owner, skipping content already archived.
    Archive(ArchiveArgs),

    /// Report whether an owner has archived a fingerprint.
    Check(CheckArgs),

    /// List an owner's archives, newest first.
    List(ListArgs),

    /// Download a stored artifact.
    Fetch(FetchArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut stdout = std::io::stdout().lock();

    if let Commands::Fingerprint(args) = &cli.command {
        return exit_code(run_fingerprint(args, &mut stdout));
    }

    let config = match ArchiveConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {e}");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(config = ?config, "configuration loaded");

    let archiver = match build_archiver(&config).await {
        Ok(archiver) => archiver,
        Err(e) => {
            tracing::error!("bootstrap failed: {e}");
            return ExitCode::from(2);
        }
    };

    let deadline = Deadline::after(config.request_timeout);
    let result = dispatch(cli.command, &archiver, deadline, &mut stdout).await;
    exit_code(result)
}

async fn dispatch(
    command: Commands,
    archiver: &Archiver,
    deadline: Deadline,
    out: &mut impl Write,
) -> anyhow::Result<u8> {
    match command {
        Commands::Fingerprint(args) => run_fingerprint(&args, out),
        Commands::Archive(args) => run_archive(&args, archiver, deadline, out).await,
        Commands::Check(args) => run_check(&args, archiver, out).await,
        Commands::List(args) => run_list(&args, archiver, out).await,
        Commands::Fetch(args) => run_fetch(&args, archiver, out).await,
    }
}

fn exit_code(result: anyhow::Result<u8>) -> ExitCode {
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
