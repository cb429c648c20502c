//! Per-request deadlines.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::ArchiveError;
use crate::phase::ArchivalPhase;

/// Point in time by which an archival request must finish, or none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline.
    pub fn none() -> Self {
        Self(None)
    }

    /// Expire `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    /// Expire at `instant`.
    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// The expiry instant, if any.
    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    /// Run `fut` for `phase`, failing with [`ArchiveError::DeadlineExceeded`]
    /// once the deadline passes. The future is dropped on expiry.
    pub async fn run<F: Future>(
        &self,
        phase: ArchivalPhase,
        fut: F,
    ) -> Result<F::Output, ArchiveError> {
        match self.0 {
            None => Ok(fut.await),
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| ArchiveError::DeadlineExceeded { phase }),
        }
    }
}
