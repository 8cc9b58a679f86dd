//! Completion tokens and waits for suspended gameplay chains
//!
//! Animations and sounds finish on the host's schedule. The host hands back
//! a [`Completion`] when it starts one and fires the paired [`Completer`]
//! when it is done. Gameplay code either polls the token once per tick or
//! awaits it as a future; both observe the same signal.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot::{self, error::TryRecvError};

/// Create a linked completer/completion pair
pub fn completion() -> (Completer, Completion) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, Completion { rx: Some(rx) })
}

/// Signalling half, held by whoever performs the work
#[derive(Debug)]
pub struct Completer {
    tx: oneshot::Sender<()>,
}

impl Completer {
    pub fn complete(self) {
        // the waiter may already be gone; nothing to report then
        let _ = self.tx.send(());
    }
}

/// Waiting half. Resolves once the completer fires or is dropped.
#[derive(Debug)]
pub struct Completion {
    rx: Option<oneshot::Receiver<()>>,
}

impl Completion {
    /// A token that is already resolved
    pub fn ready() -> Self {
        Self { rx: None }
    }

    /// Non-blocking check, for the per-tick poll
    pub fn is_done(&mut self) -> bool {
        let Some(rx) = self.rx.as_mut() else {
            return true;
        };
        match rx.try_recv() {
            Ok(()) | Err(TryRecvError::Closed) => {
                self.rx = None;
                true
            }
            Err(TryRecvError::Empty) => false,
        }
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(());
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(_) => {
                self.rx = None;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// What a suspended step is waiting for
#[derive(Debug)]
pub enum Wait {
    /// An external signal (animation finished, sound ended)
    Signal(Completion),
    /// A deadline on the simulation clock
    Until(Duration),
}

impl Wait {
    pub fn is_over(&mut self, now: Duration) -> bool {
        match self {
            Wait::Signal(done) => done.is_done(),
            Wait::Until(deadline) => now >= *deadline,
        }
    }
}
