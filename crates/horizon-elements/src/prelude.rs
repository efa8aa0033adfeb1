//! Prelude module for Horizon Elements.
//!
//! ```
//! use horizon_elements::prelude::*;
//! ```

// ============================================================================
// Host environment
// ============================================================================

pub use horizon_elements_core::{
    CustomElement, Document, Element, ElementRegistry, Event, Key, KeyboardEvent,
    KeyboardModifiers,
};

// ============================================================================
// Transitions
// ============================================================================

pub use crate::animation::{AnimationGate, TransitionKind};
pub use horizon_elements_core::{CompletionHandle, Settlement, TransitionHandle};

// ============================================================================
// Widgets
// ============================================================================

pub use crate::select::{Select, SelectConfig, names as select_events};
