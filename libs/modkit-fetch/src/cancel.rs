//! Per-call cancellation: one abort signal fed by a timer and a caller token.
//!
//! [`with_cancellation`] races the exchange against both sources with
//! `tokio::select!`. The first terminal event decides the outcome; the timer
//! and the token subscription are dropped with the select, on every path.
//! The [`AbortSignal`] records which source fired, so a timeout and a caller
//! cancellation stay distinguishable even though the exchange only sees
//! "aborted". A call that completes closes its signal without a reason.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Which source triggered the abort signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The per-call deadline elapsed
    Timeout(Duration),
    /// The caller's token was cancelled
    Cancelled,
}

/// The combined abort signal of one call.
///
/// Cheap to clone; every clone observes the same state. The client attaches
/// it to the outgoing `http::Request` as an extension, so a custom transport
/// (or work it spawns) can react to the abort.
///
/// The signal settles exactly once: aborted with a reason, or closed when
/// the call finishes first. Either way, [`aborted`](Self::aborted) waiters
/// wake up.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
    /// `Some(None)` once closed without an abort
    outcome: Arc<OnceLock<Option<AbortReason>>>,
}

impl AbortSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the signal. Only the first reason is kept, and a closed
    /// signal ignores it.
    pub fn abort(&self, reason: AbortReason) {
        if self.outcome.set(Some(reason)).is_ok() {
            tracing::debug!(?reason, "abort signal fired");
            self.token.cancel();
        }
    }

    /// Settle the signal without a reason and wake every waiter.
    fn close(&self) {
        if self.outcome.set(None).is_ok() {
            self.token.cancel();
        }
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.reason().is_some()
    }

    /// The reason recorded by the first [`abort`](Self::abort), if any
    #[must_use]
    pub fn reason(&self) -> Option<AbortReason> {
        self.outcome.get().copied().flatten()
    }

    /// Wait until the signal settles.
    ///
    /// Resolves to the abort reason, or to `None` once the call finished
    /// without being aborted, so work spawned on the signal never outlives
    /// the call.
    pub async fn aborted(&self) -> Option<AbortReason> {
        self.token.cancelled().await;
        // the outcome is set before the token is cancelled
        self.reason()
    }
}

async fn expired(timeout: Duration) {
    if timeout.is_zero() {
        std::future::pending::<()>().await;
    } else {
        tokio::time::sleep(timeout).await;
    }
}

async fn cancelled(external: Option<&CancellationToken>) {
    match external {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}

/// Wait for the first abort source, then fire `signal` with it.
async fn fire(
    signal: &AbortSignal,
    timeout: Duration,
    external: Option<&CancellationToken>,
) -> AbortReason {
    let reason = tokio::select! {
        biased;
        () = cancelled(external) => AbortReason::Cancelled,
        () = expired(timeout) => AbortReason::Timeout(timeout),
    };
    signal.abort(reason);
    reason
}

/// Run `body` under a combined abort signal.
///
/// - A non-zero `timeout` starts a timer that fires the signal.
/// - An `external` token that is already cancelled fires the signal before
///   `body` is even constructed; otherwise the token is watched for the
///   duration of the call.
/// - Whichever of {body completion, timer, token} happens first decides the
///   result. Completion wins ties and closes the signal without a reason.
///   After return neither the timer nor the token can touch the signal any
///   more.
///
/// # Errors
/// Returns the [`AbortReason`] when the signal fired before `body` finished.
pub async fn with_cancellation<F, Fut>(
    timeout: Duration,
    external: Option<&CancellationToken>,
    body: F,
) -> Result<Fut::Output, AbortReason>
where
    F: FnOnce(AbortSignal) -> Fut,
    Fut: Future,
{
    let signal = AbortSignal::new();

    if external.is_some_and(CancellationToken::is_cancelled) {
        signal.abort(AbortReason::Cancelled);
        return Err(AbortReason::Cancelled);
    }

    let exchange = body(signal.clone());

    tokio::select! {
        biased;
        output = exchange => {
            signal.close();
            Ok(output)
        }
        reason = fire(&signal, timeout, external) => Err(reason),
    }
}
