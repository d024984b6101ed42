//! Cancellation and deadline propagation for storage calls.
//!
//! Every repository operation receives a [`CallContext`]. The context carries a
//! cancellation token (fired explicitly or when the owning request is dropped)
//! and an optional deadline. [`CallContext::run`] moves the actual work onto a
//! background task and races its single result against the context, so callers
//! stop waiting as soon as the context is done.
//!
//! A background task that finishes after its caller has given up checks the
//! context and drops its result instead of delivering it.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// Why a context stopped accepting results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// The background task ended without sending anything while the context
    /// was still live (it panicked).
    #[error("background task ended without a result")]
    Abandoned,
}

/// Per-call cancellation scope.
///
/// Cloning shares the same token and deadline. [`CallContext::with_timeout`]
/// derives a child that is canceled with its parent and whose deadline never
/// exceeds the parent's.
#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never canceled and has no deadline.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derives a child context that expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };

        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns a guard that cancels the context when dropped.
    ///
    /// Handlers hold the guard for the lifetime of the request so that work
    /// belonging to a disconnected client observes cancellation.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason the context is done, or `None` while it is live.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is canceled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => ContextError::Canceled,
                _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }

    /// Runs `work` on a background task and waits for its result or for the
    /// context to finish, whichever comes first.
    ///
    /// The work itself is not aborted when the context finishes. It runs to
    /// completion and then discards its result.
    ///
    /// # Errors
    ///
    /// Returns the work's own error, or the [`ContextError`] converted into `E`
    /// when the context finished first.
    pub async fn run<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<ContextError> + Send + 'static,
    {
        if let Some(err) = self.err() {
            return Err(err.into());
        }

        let (tx, rx) = oneshot::channel();
        let watcher = self.clone();

        tokio::spawn(async move {
            let outcome = work.await;

            if let Some(err) = watcher.err() {
                debug!(reason = %err, "Discarding result that arrived after the caller gave up");
                return;
            }

            let _ = tx.send(outcome);
        });

        tokio::select! {
            biased;
            received = rx => match received {
                Ok(outcome) => outcome,
                Err(_) => Err(self.err().unwrap_or(ContextError::Abandoned).into()),
            },
            err = self.done() => Err(err.into()),
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_run_returns_work_result() {
        let ctx = CallContext::background();

        let result: Result<u32, ContextError> = ctx.run(async { Ok(7) }).await;

        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_run_on_canceled_context() {
        let ctx = CallContext::background();
        ctx.cancel();

        let result: Result<u32, ContextError> = ctx.run(async { Ok(7) }).await;

        assert_eq!(result, Err(ContextError::Canceled));
    }

    #[tokio::test]
    async fn test_run_stops_waiting_at_deadline() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(20));
        let started = std::time::Instant::now();

        let result: Result<u32, ContextError> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(1)
            })
            .await;

        assert_eq!(result, Err(ContextError::DeadlineExceeded));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiting_caller_promptly() {
        let ctx = CallContext::background();
        let canceller = ctx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let result: Result<u32, ContextError> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(1)
            })
            .await;

        assert_eq!(result, Err(ContextError::Canceled));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_late_result_is_discarded_without_blocking() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(10));
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let result: Result<u32, ContextError> = ctx
            .run(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(1)
            })
            .await;

        assert_eq!(result, Err(ContextError::DeadlineExceeded));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_child_deadline_never_exceeds_parent() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async {
            let parent = CallContext::background().with_timeout(Duration::from_millis(100));
            let child = parent.with_timeout(Duration::from_secs(60));

            assert_eq!(child.deadline(), parent.deadline());
        });
    }

    #[tokio::test]
    async fn test_parent_cancel_propagates_to_child() {
        let parent = CallContext::background();
        let child = parent.with_timeout(Duration::from_secs(60));

        parent.cancel();

        assert_eq!(child.err(), Some(ContextError::Canceled));
    }

    #[tokio::test]
    async fn test_drop_guard_cancels() {
        let ctx = CallContext::background();
        {
            let _guard = ctx.cancel_on_drop();
            assert!(ctx.err().is_none());
        }
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
    }
}
