use super::errors::ClusterError;
use std::{future::Future, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-call cancellation scope.
///
/// Carries a cancellation token and an optional deadline. Cancelling the token or
/// passing the deadline stops the call immediately, aborting any in-flight endpoint
/// requests, without trying further fallbacks.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context cancelled together with `token`.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails fast if the context is already done.
    ///
    /// # Errors
    ///
    /// [`ClusterError::Cancelled`] or [`ClusterError::DeadlineExceeded`].
    pub fn check(&self) -> Result<(), ClusterError> {
        if self.token.is_cancelled() {
            return Err(ClusterError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ClusterError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ClusterError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.token.cancelled() => ClusterError::Cancelled,
                () = tokio::time::sleep_until(deadline) => ClusterError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ClusterError::Cancelled
            }
        }
    }

    /// Runs `future` unless the context finishes first.
    ///
    /// # Errors
    ///
    /// [`ClusterError::Cancelled`] or [`ClusterError::DeadlineExceeded`]; `future` is
    /// dropped in that case.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, ClusterError> {
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = future => Ok(output),
        }
    }

    /// The per-endpoint timeout to use: `limit`, shortened to the remaining deadline.
    #[must_use]
    pub fn bounded(&self, limit: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => limit.min(deadline.saturating_duration_since(Instant::now())),
            None => limit,
        }
    }
}
