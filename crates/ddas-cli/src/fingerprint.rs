//! # Fingerprint Subcommand
//!
//! Prints the content fingerprint of local files in `sha256sum` layout.
//! Needs no ledger or store.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ddas_crypto::fingerprint_reader;

/// Arguments for the fingerprint subcommand.
#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Files to fingerprint. `-` reads standard input.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Execute the fingerprint subcommand.
pub fn run_fingerprint(args: &FingerprintArgs, out: &mut impl Write) -> Result<u8> {
    for path in &args.files {
        let digested = if path.as_os_str() == "-" {
            fingerprint_reader(std::io::stdin().lock()).context("failed to read standard input")?
        } else {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            fingerprint_reader(std::io::BufReader::new(file))
                .with_context(|| format!("failed to read {}", path.display()))?
        };
        writeln!(out, "{}  {}", digested.fingerprint, path.display())?;
    }
    Ok(0)
}
