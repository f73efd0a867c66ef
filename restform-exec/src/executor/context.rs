use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Per-call deadline and cancellation signal supplied by the host.
///
/// Both only affect the waits between attempts and between polls; an HTTP
/// exchange already in flight is bounded by the request timeout instead.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every [`CallContext`] created from it.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may already be gone; nothing to signal then.
        let _ = self.0.send(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupted {
    Deadline,
    Cancelled,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(d) => d.min(deadline),
            None => deadline,
        });
        self
    }

    /// A context that can be cancelled through the returned handle.
    pub fn cancellable(self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(rx),
            ..self
        };
        (ctx, CancelHandle(tx))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    pub(crate) fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(Interrupted::Deadline),
            _ => Ok(()),
        }
    }

    /// Sleeps for `delay`, returning early when the call is cancelled. A
    /// sleep that would cross the deadline ends at the deadline with
    /// [`Interrupted::Deadline`].
    pub(crate) async fn pause(&self, delay: Duration) -> Result<(), Interrupted> {
        self.check()?;
        let wake = Instant::now() + delay;
        let (until, hits_deadline) = match self.deadline {
            Some(d) if d <= wake => (d, true),
            _ => (wake, false),
        };

        if let Some(rx) = &self.cancel {
            let mut rx = rx.clone();
            let cancelled = tokio::select! {
                _ = tokio::time::sleep_until(until) => false,
                // Err means the handle was dropped, which never cancels.
                cancelled = async { rx.wait_for(|c| *c).await.is_ok() } => cancelled,
            };
            if cancelled {
                return Err(Interrupted::Cancelled);
            }
        }
        tokio::time::sleep_until(until).await;

        if hits_deadline {
            Err(Interrupted::Deadline)
        } else {
            Ok(())
        }
    }
}
