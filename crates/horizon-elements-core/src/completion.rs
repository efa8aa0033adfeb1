//! Completion pairs: a promise with an external resolver.
//!
//! [`completion_pair`] returns a [`CompletionHandle`] (the resolver side, handed
//! to whoever finishes the work) and a [`TransitionHandle`] (the waiting side).
//! The waiting side can register continuations with
//! [`TransitionHandle::on_settled`] or be awaited as a [`Future`].
//!
//! A pair settles exactly once. The first of these wins:
//!
//! - [`CompletionHandle::complete`] settles with [`Settlement::Completed`].
//! - [`TransitionHandle::expire`] settles with [`Settlement::TimedOut`].
//! - Dropping the last clone of the resolver settles with
//!   [`Settlement::Abandoned`], since nobody is left to complete it.
//!
//! Continuations run synchronously on the thread that settles the pair, with
//! no lock held, in registration order.
//!
//! ```
//! use horizon_elements_core::{Settlement, completion_pair};
//!
//! let (resolver, handle) = completion_pair();
//! handle.on_settled(|settlement| assert_eq!(settlement, Settlement::Completed));
//! assert!(resolver.complete());
//! assert!(handle.is_settled());
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::logging::targets;

/// How a completion pair was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Settlement {
    /// Nobody claimed the work; it finished synchronously.
    Immediate,
    /// The claimant called [`CompletionHandle::complete`].
    Completed,
    /// The claimant did not complete before the deadline.
    TimedOut,
    /// Every resolver was dropped without completing.
    Abandoned,
    /// The operation was a no-op and never started.
    Skipped,
}

impl Settlement {
    /// Whether the work ran to its end, as opposed to being cut short.
    pub fn is_clean(self) -> bool {
        matches!(self, Self::Immediate | Self::Completed)
    }
}

type Continuation = Box<dyn FnOnce(Settlement) + Send + 'static>;

#[derive(Default)]
struct PairState {
    settlement: Option<Settlement>,
    continuations: Vec<Continuation>,
    wakers: Vec<Waker>,
}

#[derive(Default)]
struct CompletionState {
    inner: Mutex<PairState>,
}

impl CompletionState {
    /// Settle the pair. Returns `false` if it was already settled.
    fn settle(&self, settlement: Settlement) -> bool {
        let (continuations, wakers) = {
            let mut inner = self.inner.lock();
            if inner.settlement.is_some() {
                return false;
            }
            inner.settlement = Some(settlement);
            (
                std::mem::take(&mut inner.continuations),
                std::mem::take(&mut inner.wakers),
            )
        };

        for waker in wakers {
            waker.wake();
        }
        for continuation in continuations {
            continuation(settlement);
        }
        true
    }

    fn settlement(&self) -> Option<Settlement> {
        self.inner.lock().settlement
    }
}

/// Shared resolver state; settles the pair as abandoned when the last
/// [`CompletionHandle`] clone goes away.
struct Resolver {
    state: Arc<CompletionState>,
}

impl Drop for Resolver {
    fn drop(&mut self) {
        if self.state.settle(Settlement::Abandoned) {
            tracing::warn!(
                target: targets::CORE,
                "completion handle dropped without calling complete(); settling as abandoned"
            );
        }
    }
}

/// The resolver side of a completion pair.
///
/// Cloning is cheap; the pair is abandoned only when every clone is dropped.
#[derive(Clone)]
pub struct CompletionHandle {
    resolver: Arc<Resolver>,
}

impl CompletionHandle {
    /// Mark the work as finished.
    ///
    /// Returns `false` if the pair had already settled.
    pub fn complete(&self) -> bool {
        self.settle(Settlement::Completed)
    }

    /// Settle the pair with an explicit settlement.
    pub fn settle(&self, settlement: Settlement) -> bool {
        self.resolver.state.settle(settlement)
    }

    /// Check whether the pair has settled.
    pub fn is_settled(&self) -> bool {
        self.resolver.state.settlement().is_some()
    }
}

impl std::fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("settlement", &self.resolver.state.settlement())
            .finish()
    }
}

/// The waiting side of a completion pair.
///
/// Resolves to the [`Settlement`] when awaited.
#[derive(Clone)]
pub struct TransitionHandle {
    state: Arc<CompletionState>,
}

impl TransitionHandle {
    /// Create a handle that is already settled.
    pub fn settled(settlement: Settlement) -> Self {
        let state = Arc::new(CompletionState::default());
        state.settle(settlement);
        Self { state }
    }

    /// Check whether the pair has settled.
    pub fn is_settled(&self) -> bool {
        self.state.settlement().is_some()
    }

    /// Get the settlement, if the pair has settled.
    pub fn settlement(&self) -> Option<Settlement> {
        self.state.settlement()
    }

    /// Settle the pair as timed out.
    ///
    /// Returns `false` if the pair had already settled.
    pub fn expire(&self) -> bool {
        self.state.settle(Settlement::TimedOut)
    }

    /// Run `f` once the pair settles.
    ///
    /// If the pair has already settled, `f` runs immediately.
    pub fn on_settled<F>(&self, f: F)
    where
        F: FnOnce(Settlement) + Send + 'static,
    {
        let settlement = {
            let mut inner = self.state.inner.lock();
            match inner.settlement {
                Some(settlement) => settlement,
                None => {
                    inner.continuations.push(Box::new(f));
                    return;
                }
            }
        };
        f(settlement);
    }
}

impl Future for TransitionHandle {
    type Output = Settlement;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.state.inner.lock();
        if let Some(settlement) = inner.settlement {
            return Poll::Ready(settlement);
        }
        if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            inner.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl std::fmt::Debug for TransitionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionHandle")
            .field("settlement", &self.state.settlement())
            .finish()
    }
}

/// Create a resolver/handle pair.
pub fn completion_pair() -> (CompletionHandle, TransitionHandle) {
    let state = Arc::new(CompletionState::default());
    (
        CompletionHandle {
            resolver: Arc::new(Resolver {
                state: state.clone(),
            }),
        },
        TransitionHandle { state },
    )
}

static_assertions::assert_impl_all!(CompletionHandle: Send, Sync);
static_assertions::assert_impl_all!(TransitionHandle: Send, Sync);
