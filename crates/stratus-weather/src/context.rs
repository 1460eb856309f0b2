//! Per-request cancellation and deadline.
//!
//! Every `get_current` call takes a [`RequestContext`]. Dropping the call's
//! future already cancels everything below it; the context adds explicit
//! cancellation from another task and a deadline that provider adapters
//! apply to their network I/O through [`RequestContext::run`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::WeatherError;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context with no deadline that is never cancelled unless asked to.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_at(Instant::now() + timeout)
    }

    /// Set the deadline, keeping the earlier one if already set.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// A context cancelled together with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails if the context is already cancelled or past its deadline.
    ///
    /// # Errors
    /// `Internal` when cancelled, `Unavailable` when the deadline passed.
    pub fn check(&self) -> Result<(), WeatherError> {
        if self.is_cancelled() {
            return Err(cancelled());
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(deadline_exceeded()),
            _ => Ok(()),
        }
    }

    /// Run `operation`, giving up when the context is cancelled or its
    /// deadline passes, whichever comes first.
    ///
    /// # Errors
    /// The operation's own error, or the context error from [`Self::check`].
    pub async fn run<F, T>(&self, operation: F) -> Result<T, WeatherError>
    where
        F: Future<Output = Result<T, WeatherError>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(cancelled()),
            _ = deadline => Err(deadline_exceeded()),
            result = operation => result,
        }
    }
}

// Cancellation is the caller giving up, not the provider misbehaving, so it
// must not count against a breaker.
fn cancelled() -> WeatherError {
    WeatherError::internal("request cancelled")
}

fn deadline_exceeded() -> WeatherError {
    WeatherError::unavailable("deadline exceeded")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use stratus_core::ErrorKind;

    #[tokio::test]
    async fn test_run_returns_operation_result() {
        let ctx = RequestContext::new();
        let value = ctx.run(async { Ok::<_, WeatherError>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_after_cancel_is_internal() {
        let ctx = RequestContext::new();
        ctx.cancel();
        let err = ctx
            .run(std::future::pending::<Result<(), WeatherError>>())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(ctx.check().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_past_deadline_is_unavailable() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));
        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, WeatherError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WeatherUnavailable);
    }

    #[tokio::test]
    async fn test_child_is_cancelled_with_parent() {
        let parent = RequestContext::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelling_child_leaves_parent() {
        let parent = RequestContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancellation_token_cancels_context() {
        let ctx = RequestContext::new();
        let token = ctx.cancellation_token().clone();

        tokio::spawn(async move { token.cancel() }).await.unwrap();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.check().unwrap_err().kind(), ErrorKind::Internal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down_to_zero() {
        assert_eq!(RequestContext::new().remaining(), None);

        let ctx = RequestContext::with_timeout(Duration::from_secs(10));
        assert_eq!(ctx.remaining(), Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(ctx.remaining(), Some(Duration::from_secs(6)));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert_eq!(ctx.check().unwrap_err().kind(), ErrorKind::WeatherUnavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_at_keeps_earliest() {
        let now = Instant::now();
        let ctx = RequestContext::new()
            .deadline_at(now + Duration::from_secs(1))
            .deadline_at(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
        assert!(ctx.check().is_ok());
    }
}
