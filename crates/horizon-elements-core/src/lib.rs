//! Core systems for Horizon Elements.
//!
//! This crate provides the headless host environment the Horizon Elements
//! widgets run on:
//!
//! - **Element tree**: [`Element`] handles with attributes, text and children
//! - **Document**: the event loop owning focus, microtasks, timers and
//!   mutation observers
//! - **Events**: DOM-style [`Event`]s with bubbling and cancellation
//! - **Signal/Slot System**: the listener store behind element events
//! - **Completion pairs**: promises with an external resolver
//! - **Attribute decoding**: schema-driven configuration from attributes
//! - **Custom element registry**: tag-name keyed widget factories
//!
//! # Example
//!
//! ```
//! use horizon_elements_core::{Document, Element, Event};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let document = Document::new();
//! let button = Element::new("button").with_text("Save");
//! document.body().append_child(&button);
//!
//! let clicks = Arc::new(AtomicUsize::new(0));
//! let clicks_clone = clicks.clone();
//! document.body().add_event_listener("click", move |event: &Event| {
//!     if event.target().is_some() {
//!         clicks_clone.fetch_add(1, Ordering::SeqCst);
//!     }
//! });
//!
//! document.click(&button);
//! assert_eq!(clicks.load(Ordering::SeqCst), 1);
//! ```

pub mod attributes;
mod completion;
mod document;
mod element;
mod error;
mod event;
pub mod logging;
mod mutation;
mod registry;
mod safe_call;
mod signal;
mod task;
mod timer;

pub use attributes::{AttributeSchema, DecodedAttributes, decode};
pub use completion::{CompletionHandle, Settlement, TransitionHandle, completion_pair};
pub use document::{Document, SCROLL_LOCK_ATTRIBUTE};
pub use element::{Element, ElementId, ListenerId};
pub use error::{ElementError, Error, Result, TimerError};
pub use event::{Event, EventInit, Key, KeyboardEvent, KeyboardModifiers, names as event_names};
pub use mutation::{MutationKind, MutationRecord, ObserveOptions, ObserverId};
pub use registry::{
    AsAnyArc, CustomElement, ElementFactory, ElementRegistry, is_valid_custom_element_name,
};
pub use safe_call::safe_call;
pub use signal::{ConnectionId, Signal};
pub use task::TaskId;
pub use timer::TimerId;
