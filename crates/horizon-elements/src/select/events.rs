//! Events dispatched by the select host, and their detail payloads.
//!
//! Every event bubbles. The `before-*` events are cancelable; preventing
//! their default claims the transition's animation, which then waits for
//! [`CompletionHandle::complete`].

use horizon_elements_core::{CompletionHandle, Element, MutationRecord};

/// Event names.
pub mod names {
    pub const BEFORE_OPEN: &str = "before-open";
    pub const AFTER_OPEN: &str = "after-open";
    pub const BEFORE_CLOSE: &str = "before-close";
    pub const AFTER_CLOSE: &str = "after-close";
    pub const BEFORE_SELECT: &str = "before-select";
    pub const AFTER_SELECT: &str = "after-select";
    /// The selected values changed.
    pub const VALUE_CHANGE: &str = "value-change";
    /// The open state flipped.
    pub const STATE_CHANGE: &str = "state-change";
    /// Items were added or removed.
    pub const ITEMS_CHANGED: &str = "items-changed";
    /// The indicator icon should turn.
    pub const ICON_ROTATE: &str = "icon-rotate";
    /// A filter pass finished.
    pub const ITEMS_FILTERED: &str = "items-filtered";
}

/// Detail of `before-open`.
#[derive(Debug, Clone)]
pub struct BeforeOpenDetail {
    pub trigger: Option<Element>,
    pub content: Element,
    /// Call [`complete`](CompletionHandle::complete) when a claimed
    /// animation has finished.
    pub completion: CompletionHandle,
}

impl BeforeOpenDetail {
    pub fn complete(&self) -> bool {
        self.completion.complete()
    }
}

/// Detail of `after-open`.
#[derive(Debug, Clone)]
pub struct AfterOpenDetail {
    pub trigger: Option<Element>,
    pub content: Element,
}

/// Detail of `before-close`.
#[derive(Debug, Clone)]
pub struct BeforeCloseDetail {
    pub trigger: Option<Element>,
    pub content: Element,
    pub completion: CompletionHandle,
}

impl BeforeCloseDetail {
    pub fn complete(&self) -> bool {
        self.completion.complete()
    }
}

/// Detail of `after-close`.
#[derive(Debug, Clone)]
pub struct AfterCloseDetail {
    pub trigger: Option<Element>,
    pub content: Element,
}

/// Detail of `before-select`.
#[derive(Debug, Clone)]
pub struct BeforeSelectDetail {
    pub item: Element,
    pub value: String,
    pub completion: CompletionHandle,
}

impl BeforeSelectDetail {
    pub fn complete(&self) -> bool {
        self.completion.complete()
    }
}

/// Detail of `after-select`.
#[derive(Debug, Clone)]
pub struct AfterSelectDetail {
    pub item: Element,
    pub value: String,
    /// Whether the item is selected after the transition. Only `false` when
    /// a multiple select toggled the item off.
    pub selected: bool,
}

/// Detail of `value-change`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChangeDetail {
    /// The first selected value.
    pub value: Option<String>,
    pub values: Vec<String>,
}

/// Detail of `state-change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChangeDetail {
    pub open: bool,
}

/// Detail of `items-changed`.
#[derive(Debug, Clone)]
pub struct ItemsChangedDetail {
    /// Item count after the change.
    pub count: usize,
    /// The structural mutations of the batch.
    pub mutations: Vec<MutationRecord>,
}

/// Detail of `icon-rotate`.
#[derive(Debug, Clone)]
pub struct IconRotateDetail {
    pub icon: Option<Element>,
    /// Degrees; `0` when closed.
    pub rotation: f64,
}

/// Detail of `items-filtered`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemsFilteredDetail {
    /// The normalized query.
    pub query: String,
    pub visible: usize,
    pub total: usize,
}
