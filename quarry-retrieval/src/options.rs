use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::RetrievalError;

/// Per-call deadline and cancellation signal.
///
/// Both are optional; `CallOptions::default()` never interrupts a call.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    deadline: Option<(Instant, Duration)>,
    cancellation: Option<CancellationToken>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some((Instant::now() + timeout, timeout));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.deadline.map(|(_, timeout)| timeout)
    }

    /// Fails fast if the call is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), RetrievalError> {
        if self
            .cancellation
            .as_ref()
            .map_or(false, CancellationToken::is_cancelled)
        {
            return Err(RetrievalError::Cancelled);
        }
        if let Some((deadline, timeout)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(RetrievalError::DeadlineExceeded(timeout));
            }
        }
        Ok(())
    }

    /// Drives `future` unless cancellation or the deadline fires first, in
    /// which case the future is dropped.
    pub(crate) async fn run<F, T>(&self, future: F) -> Result<T, RetrievalError>
    where
        F: Future<Output = Result<T, RetrievalError>>,
    {
        self.check()?;

        let cancelled = async {
            match &self.cancellation {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some((deadline, _)) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(RetrievalError::Cancelled),
            _ = expired => Err(RetrievalError::DeadlineExceeded(
                self.timeout().unwrap_or_default(),
            )),
            result = future => result,
        }
    }
}
