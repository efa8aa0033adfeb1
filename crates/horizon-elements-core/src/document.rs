//! The document: root of an element tree and its event loop.
//!
//! A [`Document`] owns the `<body>` element and everything attached under it,
//! tracks keyboard focus, and runs the deferred work that elements and widgets
//! schedule:
//!
//! - **Microtasks** queued with [`Document::queue_microtask`].
//! - **Mutation batches** for observers registered with [`Document::observe`].
//! - **Timers** started with [`Document::set_timeout`].
//!
//! Microtasks and mutation batches are delivered at a *microtask checkpoint*,
//! which runs after every [`Document::dispatch_event`] and after each fired
//! timer. The checkpoint keeps going until both queues are empty, so work
//! queued by a microtask or observer is delivered in the same checkpoint.
//!
//! # Clocks
//!
//! [`Document::new`] uses the system clock; hosts call
//! [`Document::process_timers`] from their own loop. A document created with
//! [`Document::with_manual_clock`] only moves time when
//! [`Document::advance`] is called, which fires due timers in order.
//!
//! ```
//! use std::time::Duration;
//! use horizon_elements_core::Document;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! let document = Document::with_manual_clock();
//! let fired = Arc::new(AtomicBool::new(false));
//!
//! let fired_clone = fired.clone();
//! document.set_timeout(Duration::from_millis(500), move || {
//!     fired_clone.store(true, Ordering::SeqCst);
//! });
//!
//! document.advance(Duration::from_millis(499));
//! assert!(!fired.load(Ordering::SeqCst));
//! document.advance(Duration::from_millis(1));
//! assert!(fired.load(Ordering::SeqCst));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::element::Element;
use crate::event::{Event, Key, KeyboardEvent};
use crate::logging::targets;
use crate::mutation::{MutationCallback, MutationRecord, ObserveOptions, ObserverId, ObserverList};
use crate::safe_call::safe_call;
use crate::task::{TaskId, TaskQueue};
use crate::timer::{TimerId, TimerManager};

/// Attribute set on `<body>` while at least one scroll lock is held.
pub const SCROLL_LOCK_ATTRIBUTE: &str = "data-scroll-locked";

enum Clock {
    System,
    Manual(Mutex<Instant>),
}

impl Clock {
    fn now(&self) -> Instant {
        match self {
            Self::System => Instant::now(),
            Self::Manual(now) => *now.lock(),
        }
    }
}

pub(crate) struct DocumentInner {
    body: Element,
    active_element: Mutex<Option<Element>>,
    microtasks: Mutex<TaskQueue>,
    observers: Mutex<ObserverList>,
    timers: Mutex<TimerManager>,
    clock: Clock,
    in_checkpoint: AtomicBool,
    scroll_locks: Mutex<usize>,
}

/// A handle to a document. Clones refer to the same document.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Document {
    /// Create a document driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::System)
    }

    /// Create a document whose clock only moves on [`Document::advance`].
    pub fn with_manual_clock() -> Self {
        Self::with_clock(Clock::Manual(Mutex::new(Instant::now())))
    }

    fn with_clock(clock: Clock) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<DocumentInner>| {
            let body = Element::new("body");
            body.set_document(weak.clone());
            DocumentInner {
                body,
                active_element: Mutex::new(None),
                microtasks: Mutex::new(TaskQueue::new()),
                observers: Mutex::new(ObserverList::default()),
                timers: Mutex::new(TimerManager::new()),
                clock,
                in_checkpoint: AtomicBool::new(false),
                scroll_locks: Mutex::new(0),
            }
        });
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<DocumentInner>) -> Self {
        Self { inner }
    }

    /// The `<body>` element.
    pub fn body(&self) -> Element {
        self.inner.body.clone()
    }

    /// Create a detached element owned by this document.
    pub fn create_element(&self, tag: &str) -> Element {
        let element = Element::new(tag);
        element.set_document(Arc::downgrade(&self.inner));
        element
    }

    // -------------------------------------------------------------------------
    // Focus
    // -------------------------------------------------------------------------

    /// The element holding keyboard focus.
    pub fn active_element(&self) -> Option<Element> {
        self.inner.active_element.lock().clone()
    }

    pub(crate) fn set_active_element(&self, element: Option<Element>) {
        *self.inner.active_element.lock() = element;
    }

    /// Drop focus if it is held inside `subtree`.
    pub(crate) fn blur_within(&self, subtree: &Element) {
        let mut active = self.inner.active_element.lock();
        if active.as_ref().is_some_and(|element| subtree.contains(element)) {
            *active = None;
        }
    }

    // -------------------------------------------------------------------------
    // Microtasks and mutation observers
    // -------------------------------------------------------------------------

    /// Queue `task` to run at the next microtask checkpoint.
    pub fn queue_microtask<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.microtasks.lock().post(task)
    }

    /// Cancel a queued microtask that has not run yet.
    pub fn cancel_microtask(&self, id: TaskId) -> bool {
        self.inner.microtasks.lock().cancel(id)
    }

    /// Observe mutations of `target` (and its subtree if requested).
    ///
    /// `callback` receives all records collected since the previous
    /// checkpoint in one call.
    pub fn observe<F>(&self, target: &Element, options: ObserveOptions, callback: F) -> ObserverId
    where
        F: Fn(&[MutationRecord]) + Send + Sync + 'static,
    {
        let callback: MutationCallback = Arc::new(callback);
        self.inner
            .observers
            .lock()
            .observe(target.clone(), options, callback)
    }

    /// Stop an observer. Records it has not been delivered are discarded.
    pub fn disconnect_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.lock().disconnect(id)
    }

    /// Number of registered mutation observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    pub(crate) fn record_mutation(&self, record: MutationRecord) {
        self.inner.observers.lock().record(&record);
    }

    /// Whether microtasks or mutation batches are waiting for a checkpoint.
    pub fn has_pending_microtasks(&self) -> bool {
        self.inner.microtasks.lock().has_pending() || self.inner.observers.lock().has_pending()
    }

    /// Run a microtask checkpoint.
    ///
    /// Runs queued microtasks one at a time, then delivers pending mutation
    /// batches, until neither remains. A checkpoint requested from inside a
    /// running checkpoint returns immediately; the outer one drains the
    /// queues. Returns the number of callbacks run.
    pub fn run_microtasks(&self) -> usize {
        if self.inner.in_checkpoint.swap(true, Ordering::SeqCst) {
            return 0;
        }

        let mut ran = 0;
        loop {
            let task = self.inner.microtasks.lock().pop();
            if let Some(task) = task {
                safe_call("microtask", || {
                    task();
                    Ok(())
                });
                ran += 1;
                continue;
            }

            let deliveries = self.inner.observers.lock().take_deliveries();
            if deliveries.is_empty() {
                break;
            }
            for (callback, records) in deliveries {
                tracing::trace!(
                    target: targets::DOCUMENT,
                    records = records.len(),
                    "delivering mutation batch"
                );
                safe_call("mutation observer", || {
                    callback(&records);
                    Ok(())
                });
                ran += 1;
            }
        }

        self.inner.in_checkpoint.store(false, Ordering::SeqCst);
        ran
    }

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    /// The document clock's current time.
    pub fn now(&self) -> Instant {
        self.inner.clock.now()
    }

    /// Run `callback` once after `delay`.
    pub fn set_timeout<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let now = self.now();
        let id = self
            .inner
            .timers
            .lock()
            .start_one_shot(now, delay, Box::new(callback));
        tracing::trace!(target: targets::TIMER, ?id, ?delay, "timeout armed");
        id
    }

    /// Cancel a pending timeout. Returns `false` if it already fired or was
    /// cancelled.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.inner.timers.lock().stop(id).is_ok()
    }

    pub fn is_timer_active(&self, id: TimerId) -> bool {
        self.inner.timers.lock().is_active(id)
    }

    pub fn pending_timer_count(&self) -> usize {
        self.inner.timers.lock().active_count()
    }

    /// Time until the next timer is due, if any timer is pending.
    pub fn time_until_next_timer(&self) -> Option<Duration> {
        let now = self.now();
        self.inner.timers.lock().time_until_next(now)
    }

    /// Fire every timer that is due, each followed by a microtask checkpoint.
    ///
    /// Returns the number of timers fired.
    pub fn process_timers(&self) -> usize {
        let mut fired = 0;
        loop {
            let now = self.now();
            let next = self.inner.timers.lock().pop_expired(now);
            let Some((_, callback)) = next else {
                break;
            };
            safe_call("timer", || {
                callback();
                Ok(())
            });
            fired += 1;
            self.run_microtasks();
        }
        fired
    }

    /// Move a manual clock forward by `by`, firing timers as their time comes.
    ///
    /// Each timer sees the clock at its own fire time. On a system clock this
    /// only processes the timers that are already due.
    pub fn advance(&self, by: Duration) -> usize {
        let Clock::Manual(clock) = &self.inner.clock else {
            tracing::debug!(target: targets::TIMER, "advance() on a system clock document");
            return self.process_timers();
        };

        let deadline = *clock.lock() + by;
        let mut fired = 0;
        loop {
            let current = *clock.lock();
            let wait = self.inner.timers.lock().time_until_next(current);
            match wait {
                Some(wait) if current + wait <= deadline => {
                    *clock.lock() = current + wait;
                    fired += self.process_timers();
                }
                _ => break,
            }
        }
        *clock.lock() = deadline;
        fired + self.process_timers()
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Dispatch `event` to `target`, then run a microtask checkpoint.
    pub fn dispatch_event(&self, target: &Element, event: Event) -> Arc<Event> {
        let event = target.dispatch_event(event);
        self.run_microtasks();
        event
    }

    /// Dispatch a click on `target`.
    pub fn click(&self, target: &Element) -> Arc<Event> {
        self.dispatch_event(target, Event::click())
    }

    /// Dispatch a `keydown` on `target`.
    pub fn key_down(&self, target: &Element, keyboard: KeyboardEvent) -> Arc<Event> {
        self.dispatch_event(target, Event::keydown(keyboard))
    }

    /// Dispatch an unmodified key press on `target`.
    pub fn press_key(&self, target: &Element, key: Key) -> Arc<Event> {
        self.key_down(target, KeyboardEvent::new(key))
    }

    /// Dispatch an unmodified key press on the focused element, or the body
    /// when nothing has focus.
    pub fn press_key_focused(&self, key: Key) -> Arc<Event> {
        let target = self.active_element().unwrap_or_else(|| self.body());
        self.press_key(&target, key)
    }

    /// Dispatch an `input` event carrying `value` on `target`.
    pub fn input(&self, target: &Element, value: &str) -> Arc<Event> {
        self.dispatch_event(target, Event::input(value))
    }

    // -------------------------------------------------------------------------
    // Scroll lock
    // -------------------------------------------------------------------------

    /// Take a scroll lock. The body carries [`SCROLL_LOCK_ATTRIBUTE`] while
    /// any lock is held.
    pub fn lock_scroll(&self) {
        let first = {
            let mut locks = self.inner.scroll_locks.lock();
            *locks += 1;
            *locks == 1
        };
        if first {
            self.inner.body.set_attribute(SCROLL_LOCK_ATTRIBUTE, "");
        }
    }

    /// Release a scroll lock taken with [`Document::lock_scroll`].
    pub fn unlock_scroll(&self) {
        let last = {
            let mut locks = self.inner.scroll_locks.lock();
            if *locks == 0 {
                tracing::debug!(target: targets::DOCUMENT, "unbalanced unlock_scroll()");
                return;
            }
            *locks -= 1;
            *locks == 0
        };
        if last {
            self.inner.body.remove_attribute(SCROLL_LOCK_ATTRIBUTE);
        }
    }

    pub fn is_scroll_locked(&self) -> bool {
        *self.inner.scroll_locks.lock() > 0
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Document {}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("active_element", &self.active_element().map(|e| e.id()))
            .field("pending_timers", &self.pending_timer_count())
            .field("scroll_locked", &self.is_scroll_locked())
            .finish()
    }
}

static_assertions::assert_impl_all!(Document: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_appended_elements_join_document() {
        let document = Document::new();
        let list = Element::new("ul").with_child(Element::new("li"));
        assert!(list.document().is_none());

        document.body().append_child(&list);
        assert_eq!(list.document(), Some(document.clone()));
        assert!(list.children()[0].is_connected());

        list.remove();
        assert!(!list.is_connected());
    }

    #[test]
    fn test_focus_tracking() {
        let document = Document::new();
        let button = document.create_element("button");
        document.body().append_child(&button);

        button.focus();
        assert!(button.is_focused());
        assert_eq!(document.active_element(), Some(button.clone()));

        button.remove();
        assert!(document.active_element().is_none());
    }

    #[test]
    fn test_mutations_are_batched_per_checkpoint() {
        let document = Document::new();
        let list = document.create_element("ul");
        document.body().append_child(&list);

        let batches = Arc::new(Mutex::new(Vec::new()));
        let batches_clone = batches.clone();
        document.observe(&list, ObserveOptions::structure(), move |records| {
            batches_clone.lock().push(records.len());
        });

        for _ in 0..50 {
            list.append_child(&Element::new("li"));
        }
        assert!(document.has_pending_microtasks());
        document.run_microtasks();
        document.run_microtasks();

        assert_eq!(*batches.lock(), vec![50]);
    }

    #[test]
    fn test_microtasks_run_in_order_after_dispatch() {
        let document = Document::new();
        let button = document.create_element("button");
        document.body().append_child(&button);
        let log = Arc::new(Mutex::new(Vec::new()));

        let doc = document.clone();
        let log_clone = log.clone();
        button.add_event_listener("click", move |_| {
            let log = log_clone.clone();
            doc.queue_microtask(move || log.lock().push("microtask"));
            log_clone.lock().push("listener");
        });

        document.click(&button);
        assert_eq!(*log.lock(), vec!["listener", "microtask"]);
    }

    #[test]
    fn test_advance_fires_timers_at_their_time() {
        let document = Document::with_manual_clock();
        let start = document.now();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for delay in [30_u64, 10, 20] {
            let doc = document.clone();
            let seen = seen.clone();
            document.set_timeout(Duration::from_millis(delay), move || {
                seen.lock().push(doc.now().duration_since(start).as_millis());
            });
        }

        assert_eq!(document.advance(Duration::from_millis(25)), 2);
        assert_eq!(*seen.lock(), vec![10, 20]);
        assert_eq!(document.now().duration_since(start), Duration::from_millis(25));

        assert_eq!(document.advance(Duration::from_millis(5)), 1);
        assert_eq!(*seen.lock(), vec![10, 20, 30]);
    }

    #[test]
    fn test_clear_timeout() {
        let document = Document::with_manual_clock();
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_clone = fired.clone();
        let id = document.set_timeout(Duration::from_millis(100), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(document.clear_timeout(id));
        assert!(!document.clear_timeout(id));

        document.advance(Duration::from_secs(1));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_scroll_lock_is_reference_counted() {
        let document = Document::new();
        let body = document.body();

        document.lock_scroll();
        document.lock_scroll();
        assert!(body.has_attribute(SCROLL_LOCK_ATTRIBUTE));

        document.unlock_scroll();
        assert!(document.is_scroll_locked());
        document.unlock_scroll();
        assert!(!document.is_scroll_locked());
        assert!(!body.has_attribute(SCROLL_LOCK_ATTRIBUTE));

        document.unlock_scroll();
        assert!(!document.is_scroll_locked());
    }
}
