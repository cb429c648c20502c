//! # Query Subcommands
//!
//! Read-only views of an owner's archives: `check`, `list` and `fetch`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ddas_archive::Archiver;
use ddas_core::{Fingerprint, OwnerId};

/// Arguments for the check subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Owner whose archives are searched.
    #[arg(long, env = "DDAS_OWNER")]
    pub owner: OwnerId,

    /// Hex SHA-256 of the content.
    pub fingerprint: Fingerprint,
}

/// Arguments for the list subcommand.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Owner whose archives are listed.
    #[arg(long, env = "DDAS_OWNER")]
    pub owner: OwnerId,

    /// Print the records as a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the fetch subcommand.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Owner the archive belongs to.
    #[arg(long, env = "DDAS_OWNER")]
    pub owner: OwnerId,

    /// Hex SHA-256 of the content.
    pub fingerprint: Fingerprint,

    /// Write the artifact here instead of standard output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the check subcommand. Exit code 1 when not found.
pub async fn run_check(args: &CheckArgs, archiver: &Archiver, out: &mut impl Write) -> Result<u8> {
    let report = archiver
        .exists(&args.owner, &args.fingerprint)
        .await
        .context("duplicate check failed")?;

    if !report.exists {
        writeln!(out, "NOT FOUND: {}", args.fingerprint)?;
        return Ok(1);
    }
    writeln!(
        out,
        "EXISTS: {} original_name={} artifact_uri={} archived_at={}",
        args.fingerprint,
        report.original_name.unwrap_or_default(),
        report
            .artifact_uri
            .map(|u| u.to_string())
            .unwrap_or_default(),
        report
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
    )?;
    Ok(0)
}

/// Execute the list subcommand.
pub async fn run_list(args: &ListArgs, archiver: &Archiver, out: &mut impl Write) -> Result<u8> {
    let records = archiver
        .list_archives(&args.owner)
        .await
        .context("failed to list archives")?;

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &records)?;
        writeln!(out)?;
        return Ok(0);
    }

    for record in &records {
        writeln!(
            out,
            "{}  {}  {}  {}",
            record.created_at.to_rfc3339(),
            record.fingerprint,
            record.original_name,
            record.artifact_uri
        )?;
    }
    tracing::info!(owner = %args.owner, count = records.len(), "listed archives");
    Ok(0)
}

/// Execute the fetch subcommand. Exit code 1 when not found.
///
/// Without `--output` the raw artifact goes to `out`; status lines go to
/// the log so they never mix with the payload.
pub async fn run_fetch(args: &FetchArgs, archiver: &Archiver, out: &mut impl Write) -> Result<u8> {
    let Some((record, bytes)) = archiver
        .retrieve(&args.owner, &args.fingerprint)
        .await
        .context("failed to retrieve artifact")?
    else {
        eprintln!("NOT FOUND: {}", args.fingerprint);
        return Ok(1);
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            writeln!(
                out,
                "OK: {} ({} bytes) -> {}",
                record.fingerprint,
                bytes.len(),
                path.display()
            )?;
        }
        None => {
            out.write_all(&bytes)?;
            out.flush()?;
            tracing::info!(fingerprint = %record.fingerprint, bytes = bytes.len(), "artifact written to stdout");
        }
    }
    Ok(0)
}
