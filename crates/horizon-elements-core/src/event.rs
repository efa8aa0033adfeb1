//! DOM-style events.
//!
//! An [`Event`] is dispatched to a target element and, if it bubbles, to each
//! of the target's ancestors in turn. Listeners can cancel its default action
//! with [`Event::prevent_default`] (only when the event is cancelable) and stop
//! it from reaching further elements with [`Event::stop_propagation`].
//!
//! Custom events carry a typed `detail` payload:
//!
//! ```
//! use horizon_elements_core::Event;
//!
//! #[derive(Debug)]
//! struct Progress(u32);
//!
//! let event = Event::custom("progress", Progress(40), false);
//! assert_eq!(event.detail::<Progress>().map(|p| p.0), Some(40));
//! assert!(event.bubbles());
//! ```

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::element::Element;

/// Names of the built-in event types.
pub mod names {
    /// A pointer activation.
    pub const CLICK: &str = "click";
    /// A key press.
    pub const KEYDOWN: &str = "keydown";
    /// A text field's value changed.
    pub const INPUT: &str = "input";
}

/// Logical key values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Space,
    Escape,
    Tab,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
    Backspace,
    Delete,
    /// A key that produces a single character.
    Character(char),
    /// Any other named key.
    Unidentified(String),
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` string to a key.
    ///
    /// A single space maps to [`Key::Space`] rather than a character.
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            "Enter" => Self::Enter,
            " " | "Spacebar" => Self::Space,
            "Escape" | "Esc" => Self::Escape,
            "Tab" => Self::Tab,
            "ArrowUp" | "Up" => Self::ArrowUp,
            "ArrowDown" | "Down" => Self::ArrowDown,
            "ArrowLeft" | "Left" => Self::ArrowLeft,
            "ArrowRight" | "Right" => Self::ArrowRight,
            "Home" => Self::Home,
            "End" => Self::End,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "Backspace" => Self::Backspace,
            "Delete" | "Del" => Self::Delete,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Character(c),
                    _ => Self::Unidentified(other.to_string()),
                }
            }
        }
    }

    /// The character this key produces, if it is a printable character key.
    pub fn printable_char(&self) -> Option<char> {
        match self {
            Self::Character(c) if !c.is_control() => Some(*c),
            _ => None,
        }
    }
}

/// Keyboard modifier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyboardModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyboardModifiers {
    /// Whether a command modifier (ctrl, alt or meta) is held.
    pub fn has_command(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// The payload of a `keydown` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub key: Key,
    pub modifiers: KeyboardModifiers,
    /// Whether this press is an auto-repeat.
    pub repeat: bool,
}

impl KeyboardEvent {
    /// Create a key press with no modifiers.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: KeyboardModifiers::default(),
            repeat: false,
        }
    }

    /// Set the modifier state.
    pub fn with_modifiers(mut self, modifiers: KeyboardModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Options for constructing an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
}

#[derive(Debug, Clone)]
enum EventPayload {
    None,
    Keyboard(KeyboardEvent),
    Input(String),
}

/// An event dispatched through the element tree.
pub struct Event {
    kind: String,
    init: EventInit,
    default_prevented: AtomicBool,
    propagation_stopped: AtomicBool,
    immediate_propagation_stopped: AtomicBool,
    target: Mutex<Option<Element>>,
    current_target: Mutex<Option<Element>>,
    detail: Option<Arc<dyn Any + Send + Sync>>,
    payload: EventPayload,
}

impl Event {
    /// Create a plain event.
    pub fn new(kind: impl Into<String>, init: EventInit) -> Self {
        Self {
            kind: kind.into(),
            init,
            default_prevented: AtomicBool::new(false),
            propagation_stopped: AtomicBool::new(false),
            immediate_propagation_stopped: AtomicBool::new(false),
            target: Mutex::new(None),
            current_target: Mutex::new(None),
            detail: None,
            payload: EventPayload::None,
        }
    }

    /// Create a bubbling custom event carrying `detail`.
    pub fn custom<T>(kind: impl Into<String>, detail: T, cancelable: bool) -> Self
    where
        T: Any + Send + Sync,
    {
        let mut event = Self::new(
            kind,
            EventInit {
                bubbles: true,
                cancelable,
            },
        );
        event.detail = Some(Arc::new(detail));
        event
    }

    /// Create a bubbling, cancelable `click` event.
    pub fn click() -> Self {
        Self::new(
            names::CLICK,
            EventInit {
                bubbles: true,
                cancelable: true,
            },
        )
    }

    /// Create a bubbling, cancelable `keydown` event.
    pub fn keydown(keyboard: KeyboardEvent) -> Self {
        let mut event = Self::new(
            names::KEYDOWN,
            EventInit {
                bubbles: true,
                cancelable: true,
            },
        );
        event.payload = EventPayload::Keyboard(keyboard);
        event
    }

    /// Create a bubbling `input` event carrying the field's new value.
    pub fn input(value: impl Into<String>) -> Self {
        let mut event = Self::new(
            names::INPUT,
            EventInit {
                bubbles: true,
                cancelable: false,
            },
        );
        event.payload = EventPayload::Input(value.into());
        event
    }

    /// The event type.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn bubbles(&self) -> bool {
        self.init.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.init.cancelable
    }

    /// Get the detail payload, if it has type `T`.
    pub fn detail<T: Any>(&self) -> Option<&T> {
        self.detail.as_deref().and_then(|d| d.downcast_ref::<T>())
    }

    /// Get the keyboard payload of a `keydown` event.
    pub fn keyboard(&self) -> Option<&KeyboardEvent> {
        match &self.payload {
            EventPayload::Keyboard(keyboard) => Some(keyboard),
            _ => None,
        }
    }

    /// Get the value carried by an `input` event.
    pub fn input_value(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Input(value) => Some(value),
            _ => None,
        }
    }

    /// Cancel the event's default action. Ignored for non-cancelable events.
    pub fn prevent_default(&self) {
        if self.init.cancelable {
            self.default_prevented.store(true, Ordering::SeqCst);
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::SeqCst)
    }

    /// Stop the event from reaching further elements on its path.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.store(true, Ordering::SeqCst);
    }

    /// Stop the event from reaching any further listener, including the
    /// remaining listeners on the current element.
    pub fn stop_immediate_propagation(&self) {
        self.propagation_stopped.store(true, Ordering::SeqCst);
        self.immediate_propagation_stopped
            .store(true, Ordering::SeqCst);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.load(Ordering::SeqCst)
    }

    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped.load(Ordering::SeqCst)
    }

    /// The element the event was dispatched to.
    pub fn target(&self) -> Option<Element> {
        self.target.lock().clone()
    }

    /// The element whose listeners are currently running.
    pub fn current_target(&self) -> Option<Element> {
        self.current_target.lock().clone()
    }

    pub(crate) fn set_target(&self, target: &Element) {
        *self.target.lock() = Some(target.clone());
    }

    pub(crate) fn set_current_target(&self, current: Option<&Element>) {
        *self.current_target.lock() = current.cloned();
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("bubbles", &self.init.bubbles)
            .field("cancelable", &self.init.cancelable)
            .field("default_prevented", &self.default_prevented())
            .field("payload", &self.payload)
            .finish()
    }
}

static_assertions::assert_impl_all!(Event: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_dom_key() {
        assert_eq!(Key::from_dom_key(" "), Key::Space);
        assert_eq!(Key::from_dom_key("ArrowDown"), Key::ArrowDown);
        assert_eq!(Key::from_dom_key("a"), Key::Character('a'));
        assert_eq!(
            Key::from_dom_key("F5"),
            Key::Unidentified("F5".to_string())
        );
        assert_eq!(Key::from_dom_key("é").printable_char(), Some('é'));
        assert_eq!(Key::Enter.printable_char(), None);
    }

    #[test]
    fn test_prevent_default_requires_cancelable() {
        let event = Event::input("x");
        event.prevent_default();
        assert!(!event.default_prevented());

        let event = Event::click();
        event.prevent_default();
        assert!(event.default_prevented());
    }

    #[test]
    fn test_detail_downcast() {
        let event = Event::custom("value-change", 7_u32, false);
        assert_eq!(event.detail::<u32>(), Some(&7));
        assert!(event.detail::<String>().is_none());
        assert!(Event::click().detail::<u32>().is_none());
    }

    #[test]
    fn test_stop_immediate_implies_stop() {
        let event = Event::click();
        event.stop_immediate_propagation();
        assert!(event.propagation_stopped());
        assert!(event.immediate_propagation_stopped());
    }
}
