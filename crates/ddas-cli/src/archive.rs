//! # Archive Subcommand
//!
//! Streams a local file (or standard input) through the archive engine for
//! one owner and reports whether it was new.
//!
//! ```text
//! CREATED: <fingerprint> -> <artifact-uri>
//! DUPLICATE: <fingerprint> -> <artifact-uri> original_name=<name> archived_at=<rfc3339>
//! REJECTED: <reason>
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ddas_archive::{ArchiveOutcome, Archiver, Deadline};
use ddas_core::OwnerId;
use ddas_crypto::ReaderSource;

/// Arguments for the archive subcommand.
#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Owner the archive is recorded under.
    #[arg(long, env = "DDAS_OWNER")]
    pub owner: OwnerId,

    /// Display name to record. Defaults to the file name.
    #[arg(long)]
    pub name: Option<String>,

    /// File to archive. `-` reads standard input.
    pub file: PathBuf,
}

impl ArchiveArgs {
    fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if self.file.as_os_str() == "-" {
            return String::new();
        }
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Execute the archive subcommand.
///
/// Exit code 0 when a new archive was created, 1 for a duplicate or a
/// rejection.
pub async fn run_archive(
    args: &ArchiveArgs,
    archiver: &Archiver,
    deadline: Deadline,
    out: &mut impl Write,
) -> Result<u8> {
    let name = args.display_name();

    let outcome = if args.file.as_os_str() == "-" {
        let mut source = ReaderSource::new(tokio::io::stdin());
        archiver.archive(&args.owner, &name, &mut source, deadline).await
    } else {
        let file = tokio::fs::File::open(&args.file)
            .await
            .with_context(|| format!("failed to open {}", args.file.display()))?;
        let mut source = ReaderSource::new(file);
        archiver.archive(&args.owner, &name, &mut source, deadline).await
    };

    report(&outcome, out)
}

fn report(outcome: &ArchiveOutcome, out: &mut impl Write) -> Result<u8> {
    match outcome {
        ArchiveOutcome::Created {
            fingerprint,
            artifact_uri,
            ..
        } => {
            writeln!(out, "CREATED: {fingerprint} -> {artifact_uri}")?;
            Ok(0)
        }
        ArchiveOutcome::Duplicate {
            fingerprint,
            artifact_uri,
            original_name,
            created_at,
        } => {
            writeln!(
                out,
                "DUPLICATE: {fingerprint} -> {artifact_uri} original_name={original_name} archived_at={}",
                created_at.to_rfc3339()
            )?;
            Ok(1)
        }
        ArchiveOutcome::Rejected { reason } => {
            writeln!(out, "REJECTED: {reason}")?;
            Ok(1)
        }
    }
}
