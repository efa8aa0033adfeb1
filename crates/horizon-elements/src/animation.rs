//! The before/after transition protocol.
//!
//! Every animated transition (open, close, select) follows the same steps:
//!
//! 1. [`AnimationGate::announce`] dispatches a cancelable `before-*` event
//!    whose detail carries a [`CompletionHandle`].
//! 2. If no listener calls `prevent_default()`, the transition settles
//!    immediately as [`Settlement::Immediate`].
//! 3. If a listener prevents the default, it has claimed the animation and
//!    must call [`CompletionHandle::complete`] when done. The transition stays
//!    pending until then, until the configured timeout expires, or until every
//!    clone of the completion handle is dropped.
//! 4. [`PendingTransition::finish`] registers the continuation that applies
//!    the final state and dispatches the `after-*` event.
//!
//! ```
//! use horizon_elements::animation::{AnimationGate, TransitionKind};
//! use horizon_elements_core::{Element, Settlement};
//!
//! let host = Element::new("horizon-select");
//! let gate = AnimationGate::new();
//!
//! let pending = gate.announce(&host, TransitionKind::Open, |completion| completion);
//! let handle = pending.finish(|settlement| assert_eq!(settlement, Settlement::Immediate));
//! assert_eq!(handle.settlement(), Some(Settlement::Immediate));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use horizon_elements_core::{
    CompletionHandle, Document, Element, Event, Settlement, TimerId, TransitionHandle,
    completion_pair, safe_call,
};
use parking_lot::Mutex;

use crate::logging::targets;

// ============================================================================
// Transition identity
// ============================================================================

/// The kind of an animated transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Open,
    Close,
    Select,
}

impl TransitionKind {
    /// Name of the cancelable event announcing the transition.
    pub fn before_event(self) -> &'static str {
        match self {
            Self::Open => "before-open",
            Self::Close => "before-close",
            Self::Select => "before-select",
        }
    }

    /// Name of the event dispatched once the transition has finished.
    pub fn after_event(self) -> &'static str {
        match self {
            Self::Open => "after-open",
            Self::Close => "after-close",
            Self::Select => "after-select",
        }
    }

    /// Whether this transition shows or hides content.
    pub fn is_visibility(self) -> bool {
        matches!(self, Self::Open | Self::Close)
    }
}

/// Identifies one announced transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(u64);

impl TransitionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transition#{}", self.0)
    }
}

// ============================================================================
// AnimationGate
// ============================================================================

type InFlight = Arc<Mutex<HashMap<TransitionId, TransitionKind>>>;

/// Runs the before/after protocol and tracks transitions in flight.
#[derive(Default)]
pub struct AnimationGate {
    in_flight: InFlight,
    timeout: Mutex<Option<Duration>>,
}

impl AnimationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound how long a claimed transition may stay pending.
    ///
    /// `None` waits until the claimant completes or drops its handle.
    pub fn set_timeout(&self, timeout: Option<Duration>) {
        *self.timeout.lock() = timeout;
    }

    pub fn timeout(&self) -> Option<Duration> {
        *self.timeout.lock()
    }

    /// Whether an open or close transition has been announced and not yet
    /// finished.
    pub fn is_animating(&self) -> bool {
        self.in_flight.lock().values().any(|kind| kind.is_visibility())
    }

    /// Number of transitions announced and not yet finished.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Dispatch the cancelable `before-*` event for `kind` on `host`.
    ///
    /// `detail` builds the event detail around the transition's completion
    /// handle. The transition counts as in flight from before the dispatch
    /// until its continuation runs, so listeners that re-enter the widget see
    /// it as animating.
    pub fn announce<D, F>(&self, host: &Element, kind: TransitionKind, detail: F) -> PendingTransition
    where
        D: Any + Send + Sync,
        F: FnOnce(CompletionHandle) -> D,
    {
        let id = TransitionId::next();
        let (resolver, handle) = completion_pair();
        self.in_flight.lock().insert(id, kind);

        let event = host.dispatch_event(Event::custom(
            kind.before_event(),
            detail(resolver.clone()),
            true,
        ));
        let claimed = event.default_prevented();
        drop(event);

        let mut timer = None;
        if claimed {
            tracing::debug!(target: targets::ANIMATION, %id, ?kind, "animation claimed");
            if let Some(timeout) = self.timeout()
                && let Some(document) = host.document()
            {
                let expiring = handle.clone();
                let timer_id = document.set_timeout(timeout, move || {
                    if expiring.expire() {
                        tracing::warn!(
                            target: targets::ANIMATION,
                            %id,
                            ?kind,
                            ?timeout,
                            "claimed animation did not complete in time"
                        );
                    }
                });
                timer = Some((document, timer_id));
            }
        } else {
            resolver.settle(Settlement::Immediate);
        }
        // Only the claimant's clones keep the transition alive from here on.
        drop(resolver);

        PendingTransition {
            id,
            kind,
            claimed,
            handle,
            timer,
            in_flight: self.in_flight.clone(),
        }
    }
}

impl fmt::Debug for AnimationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationGate")
            .field("in_flight", &self.in_flight_count())
            .field("timeout", &self.timeout())
            .finish()
    }
}

// ============================================================================
// PendingTransition
// ============================================================================

/// An announced transition waiting for its continuation.
#[must_use = "call finish() or the transition stays in flight"]
pub struct PendingTransition {
    id: TransitionId,
    kind: TransitionKind,
    claimed: bool,
    handle: TransitionHandle,
    timer: Option<(Document, TimerId)>,
    in_flight: InFlight,
}

impl PendingTransition {
    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    /// Whether a listener prevented the default and took over the animation.
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// The settlement so far; `None` while a claimed animation is running.
    pub fn settlement(&self) -> Option<Settlement> {
        self.handle.settlement()
    }

    /// Run `continuation` once the transition settles.
    ///
    /// The transition leaves the in-flight set before `continuation` runs.
    /// The returned handle settles, with the same settlement, after
    /// `continuation` has returned.
    pub fn finish<F>(self, continuation: F) -> TransitionHandle
    where
        F: FnOnce(Settlement) + Send + 'static,
    {
        let Self {
            id,
            kind,
            handle,
            timer,
            in_flight,
            ..
        } = self;

        let (done, finished) = completion_pair();
        handle.on_settled(move |settlement| {
            in_flight.lock().remove(&id);
            if let Some((document, timer_id)) = timer {
                document.clear_timeout(timer_id);
            }
            tracing::debug!(target: targets::ANIMATION, %id, ?kind, ?settlement, "transition settled");

            safe_call(kind.after_event(), || {
                continuation(settlement);
                Ok(())
            });
            done.settle(settlement);
        });
        finished
    }
}

impl fmt::Debug for PendingTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransition")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("claimed", &self.claimed)
            .field("settlement", &self.handle.settlement())
            .finish()
    }
}

static_assertions::assert_impl_all!(AnimationGate: Send, Sync);
static_assertions::assert_impl_all!(PendingTransition: Send, Sync);
