//! Per-call cancellation and deadline
//!
//! Every repository operation takes a [`RequestContext`]. The storage future
//! is raced against the context's token and deadline; whichever fires first
//! drops the storage future and fails the call with a `Cancelled` error.
//! Writes run inside a single statement or transaction, so a dropped future
//! rolls back instead of leaving a partial row.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::repository::{RepositoryError, RepositoryOperation, RepositoryResult};

/// Cancellation token plus optional deadline for one unit of work
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled unless [`cancel`](Self::cancel) is called
    pub fn new() -> Self {
        Self::default()
    }

    /// A context cancelled whenever `parent` is
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            deadline: None,
        }
    }

    /// Bound the context by `timeout` from now
    ///
    /// A timeout too large to represent leaves the context without a deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `fut` unless the context is cancelled or its deadline passes first
    pub async fn run<T, F>(&self, operation: RepositoryOperation, fut: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                Err(RepositoryError::cancelled(operation, "request cancelled"))
            }
            _ = deadline => {
                Err(RepositoryError::cancelled(operation, "deadline exceeded"))
            }
            result = fut => result,
        }
    }
}
