//! Signal/slot system for Horizon Elements.
//!
//! Signals are the listener store behind element events: every event type an
//! element listens for owns one [`Signal`], and dispatching an event emits it.
//!
//! # Re-entrancy
//!
//! Slots run with no lock held. [`Signal::emit`] snapshots the connected
//! slots before invoking them, so a slot may connect, disconnect or emit on
//! the same signal. Connections made during an emission are not invoked by
//! that emission.
//!
//! # Example
//!
//! ```
//! use horizon_elements_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//!
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! text_changed.emit(&"Hello, World!".to_string());
//! text_changed.disconnect(conn_id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

struct Connection<Args> {
    /// Position in connection order. Slot keys are reused after a
    /// disconnect, so they cannot order the slots.
    order: u64,
    slot: Slot<Args>,
}

/// A type-safe signal that can have multiple connected slots.
///
/// Slots are invoked in connection order.
pub struct Signal<Args> {
    /// All active connections.
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
    next_order: AtomicU64,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            next_order: AtomicU64::new(0),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        self.connections.lock().insert(Connection {
            order,
            slot: Arc::new(slot),
        })
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Emit the signal, invoking all connected slots in connection order.
    ///
    /// Returns the number of slots invoked.
    pub fn emit(&self, args: &Args) -> usize {
        self.emit_while(args, || true)
    }

    /// Emit the signal, stopping before the next slot once `keep_going`
    /// returns `false`.
    ///
    /// Used by event dispatch to honor `stop_immediate_propagation`.
    pub fn emit_while(&self, args: &Args, keep_going: impl Fn() -> bool) -> usize {
        let mut ordered: Vec<(u64, Slot<Args>)> = self
            .connections
            .lock()
            .values()
            .map(|connection| (connection.order, connection.slot.clone()))
            .collect();
        ordered.sort_unstable_by_key(|(order, _)| *order);
        let slots: Vec<Slot<Args>> = ordered.into_iter().map(|(_, slot)| slot).collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        let mut invoked = 0;
        for slot in slots {
            if !keep_going() {
                break;
            }
            slot(args);
            invoked += 1;
        }
        invoked
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(&42);
        signal.emit(&100);

        assert_eq!(*received.lock(), vec![42, 100]);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let conn_id = signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(&1);
        assert!(signal.disconnect(conn_id));
        assert!(!signal.disconnect(conn_id));
        signal.emit(&2);

        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn test_slots_run_in_connection_order_after_reuse() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let connect = |name: &'static str| {
            let order = order.clone();
            signal.connect(move |_| order.lock().push(name))
        };
        let first = connect("first");
        connect("second");
        assert!(signal.disconnect(first));
        connect("third");
        connect("fourth");

        signal.emit(&());
        assert_eq!(*order.lock(), vec!["second", "third", "fourth"]);
    }

    #[test]
    fn test_slot_can_connect_during_emit() {
        // Connecting from inside a slot must not deadlock, and the new slot
        // only sees later emissions.
        let signal = Arc::new(Signal::<()>::new());
        let late_calls = Arc::new(AtomicUsize::new(0));

        let signal_clone = Arc::downgrade(&signal);
        let late_clone = late_calls.clone();
        signal.connect(move |_| {
            if let Some(signal) = signal_clone.upgrade() {
                let late = late_clone.clone();
                signal.connect(move |_| {
                    late.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        signal.emit(&());
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(signal.connection_count(), 2);

        signal.emit(&());
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_while_stops_early() {
        let signal = Signal::<()>::new();
        let stop = Arc::new(AtomicBool::new(false));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let stop = stop.clone();
            let calls = calls.clone();
            signal.connect(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                stop.store(true, Ordering::SeqCst);
            });
        }

        let invoked = signal.emit_while(&(), || !stop.load(Ordering::SeqCst));
        assert_eq!(invoked, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
