//! The select widget.
//!
//! A [`Select`] turns a host element and its marked descendants into a
//! listbox select: a trigger that toggles a popup, items that can be chosen
//! singly or multiply, keyboard navigation with type-ahead, and an optional
//! search field that filters the items. The widget renders nothing; it only
//! maintains state, ARIA attributes and `data-*` hooks for styling.
//!
//! # Markup
//!
//! ```text
//! <horizon-select placeholder="Pick a fruit">
//!   <button data-select-trigger>
//!     <span data-select-value></span>
//!     <span data-select-icon></span>
//!   </button>
//!   <div data-select-content>
//!     <input data-select-search>
//!     <div data-select-item value="apple">Apple</div>
//!     <div data-select-item value="banana">Banana</div>
//!     <div data-select-empty>No results</div>
//!   </div>
//! </horizon-select>
//! ```
//!
//! # Transitions
//!
//! [`open`](Select::open), [`close`](Select::close) and
//! [`select_item`](Select::select_item) announce themselves with a
//! cancelable `before-*` event (see [`crate::animation`]). They return a
//! [`TransitionHandle`] that settles once the `after-*` event has been
//! dispatched, or right away as [`Settlement::Skipped`] when the call was a
//! no-op.
//!
//! # Example
//!
//! ```
//! use horizon_elements::select::{Select, parts};
//! use horizon_elements_core::{Document, Element};
//!
//! let document = Document::new();
//! let host = Element::new("horizon-select")
//!     .with_child(Element::new("button").with_attribute(parts::TRIGGER, ""))
//!     .with_child(
//!         Element::new("div")
//!             .with_attribute(parts::CONTENT, "")
//!             .with_child(Element::new("div").with_attribute(parts::ITEM, "").with_text("Apple"))
//!             .with_child(Element::new("div").with_attribute(parts::ITEM, "").with_text("Banana")),
//!     );
//! document.body().append_child(&host);
//!
//! let select = Select::attach(host);
//! select.open();
//! select.select_item(&select.items()[1]);
//! assert_eq!(select.get_value().as_deref(), Some("Banana"));
//! assert!(!select.is_open());
//! ```

mod config;
mod events;
mod filter;
mod items;
mod keyboard;
mod navigator;
pub mod parts;
mod selection;
mod type_ahead;

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use horizon_elements_core::{
    CustomElement, Document, Element, Event, ListenerId, MutationRecord, ObserveOptions,
    ObserverId, Result, Settlement, TimerId, TransitionHandle, event_names, safe_call,
};
use parking_lot::Mutex;

pub use config::{SelectConfig, attrs, schema};
pub use events::{
    AfterCloseDetail, AfterOpenDetail, AfterSelectDetail, BeforeCloseDetail, BeforeOpenDetail,
    BeforeSelectDetail, IconRotateDetail, ItemsChangedDetail, ItemsFilteredDetail,
    StateChangeDetail, ValueChangeDetail, names,
};
pub use filter::{FilterEngine, FilterOutcome, normalize_query};
pub use items::{FILTERED, Item, ItemRegistry};
pub use keyboard::{KeyAction, route};
pub use navigator::{FocusNavigator, HIGHLIGHTED};
pub use parts::Parts;
pub use selection::SelectionSet;
pub use type_ahead::{TYPE_AHEAD_RESET, TypeAheadMatcher};

use crate::animation::{AnimationGate, TransitionKind};
use crate::logging::targets;

/// Marks selected items.
pub const SELECTED: &str = "data-selected";
/// `open` or `closed` on the host, trigger and content.
pub const DATA_STATE: &str = "data-state";
/// Set on the value part while nothing is selected.
pub const DATA_PLACEHOLDER: &str = "data-placeholder";
/// The icon part's current rotation in degrees.
pub const DATA_ROTATION: &str = "data-rotation";

fn skipped() -> TransitionHandle {
    TransitionHandle::settled(Settlement::Skipped)
}

fn state_name(open: bool) -> &'static str {
    if open { "open" } else { "closed" }
}

fn bool_attr(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

// ============================================================================
// State
// ============================================================================

struct SelectState {
    config: SelectConfig,
    parts: Parts,
    selection: SelectionSet,
    navigator: FocusNavigator,
    type_ahead: TypeAheadMatcher,
    type_ahead_timer: Option<TimerId>,
    filter: FilterEngine,
    open: bool,
    /// The value part's authored text, shown when nothing is selected and
    /// no `placeholder` attribute is set.
    authored_placeholder: String,
    /// Listener on the document body that closes on outside clicks.
    outside_click: Option<ListenerId>,
    scroll_locked: bool,
}

impl SelectState {
    fn new(config: SelectConfig) -> Self {
        Self {
            selection: SelectionSet::new(config.multiple),
            config,
            parts: Parts::default(),
            navigator: FocusNavigator::new(),
            type_ahead: TypeAheadMatcher::new(),
            type_ahead_timer: None,
            filter: FilterEngine::new(),
            open: false,
            authored_placeholder: String::new(),
            outside_click: None,
            scroll_locked: false,
        }
    }
}

/// Listeners and observers installed by [`Select::connect`].
#[derive(Default)]
struct Wiring {
    connected: bool,
    document: Option<Document>,
    listeners: Vec<ListenerId>,
    observers: Vec<ObserverId>,
}

// ============================================================================
// Select
// ============================================================================

/// Select controller for one host element.
///
/// The controller is the only writer of its state. Event listeners and
/// observers hold weak references to it, so dropping the last `Arc` detaches
/// the widget.
pub struct Select {
    host: Element,
    this: Weak<Select>,
    state: Mutex<SelectState>,
    items: ItemRegistry,
    gate: AnimationGate,
    wiring: Mutex<Wiring>,
}

impl Select {
    /// Create a controller for `host` without connecting it.
    pub fn new(host: Element) -> Arc<Self> {
        let config = SelectConfig::from_element(&host);
        Arc::new_cyclic(|this| Self {
            items: ItemRegistry::new(host.clone()),
            host,
            this: this.clone(),
            state: Mutex::new(SelectState::new(config)),
            gate: AnimationGate::new(),
            wiring: Mutex::new(Wiring::default()),
        })
    }

    /// Create a controller for `host` and connect it.
    pub fn attach(host: Element) -> Arc<Self> {
        let select = Self::new(host);
        select.connect();
        select
    }

    pub fn host(&self) -> &Element {
        &self.host
    }

    fn document(&self) -> Option<Document> {
        self.host.document()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Read the configuration and parts, seed the selection, write the
    /// initial ARIA state and install listeners and observers.
    ///
    /// Connecting twice is a no-op. Mutations are only observed when the
    /// host belongs to a document.
    pub fn connect(&self) {
        safe_call("Select::connect", || self.try_connect());
    }

    fn try_connect(&self) -> Result<()> {
        let mut wiring = self.wiring.lock();
        if wiring.connected {
            return Ok(());
        }

        let config = SelectConfig::from_element(&self.host);
        let parts = Parts::discover(&self.host);
        parts.warn_missing(&self.host);
        self.gate.set_timeout(config.animation_timeout);

        self.items.invalidate();
        let item_count = {
            let mut state = self.state.lock();
            let items = self.items.items();

            let mut selection = SelectionSet::new(config.multiple);
            let seeded = self
                .host
                .attribute("value")
                .filter(|value| !value.is_empty())
                .into_iter()
                .chain(
                    items
                        .iter()
                        .filter(|item| item.element().has_attribute("selected"))
                        .map(Item::value),
                );
            selection.replace_all(seeded);

            state.authored_placeholder = parts
                .value
                .as_ref()
                .map(|value| value.text().trim().to_string())
                .unwrap_or_default();
            state.selection = selection;
            state.config = config;
            state.parts = parts;
            state.navigator = FocusNavigator::new();

            if let Some(content) = &state.parts.content {
                content.set_hidden(!state.open);
            }
            if let Some(empty) = &state.parts.empty {
                empty.set_hidden(!state.filter.is_active());
            }
            self.apply_aria(&state);
            self.refresh_items(&state, &items);
            self.refresh_display(&state, &items);
            items.len()
        };

        wiring.listeners = vec![
            self.listen(event_names::CLICK, Self::handle_click),
            self.listen(event_names::KEYDOWN, Self::handle_keydown),
            self.listen(event_names::INPUT, Self::handle_input),
        ];

        let document = self.document();
        match &document {
            Some(document) => {
                let this = self.this.clone();
                let structure = document.observe(&self.host, ObserveOptions::structure(), move |records| {
                    if let Some(select) = this.upgrade() {
                        select.handle_structure(records);
                    }
                });
                let this = self.this.clone();
                let attributes = document.observe(
                    &self.host,
                    ObserveOptions::attributes(schema().names()),
                    move |records| {
                        if let Some(select) = this.upgrade() {
                            select.handle_attributes(records);
                        }
                    },
                );
                wiring.observers = vec![structure, attributes];
            }
            None => {
                tracing::debug!(
                    target: targets::SELECT,
                    tag = %self.host.tag(),
                    "host is not in a document; mutations are not observed"
                );
            }
        }
        wiring.document = document;
        wiring.connected = true;

        tracing::debug!(target: targets::SELECT, tag = %self.host.tag(), items = item_count, "select connected");
        Ok(())
    }

    /// Remove every listener, observer, timer and scroll lock the widget
    /// holds. The widget can be connected again afterwards.
    pub fn disconnect(&self) {
        let wiring = std::mem::take(&mut *self.wiring.lock());
        if !wiring.connected {
            return;
        }

        for listener in &wiring.listeners {
            self.host.remove_event_listener(listener);
        }
        let document = wiring.document.or_else(|| self.document());
        if let Some(document) = &document {
            for observer in wiring.observers {
                document.disconnect_observer(observer);
            }
        }

        let mut state = self.state.lock();
        if let Some(document) = &document {
            if let Some(listener) = state.outside_click.take() {
                document.body().remove_event_listener(&listener);
            }
            if let Some(timer) = state.type_ahead_timer.take() {
                document.clear_timeout(timer);
            }
            if state.scroll_locked {
                document.unlock_scroll();
            }
        }
        state.outside_click = None;
        state.type_ahead_timer = None;
        state.scroll_locked = false;
        if state.open {
            state.open = false;
            if let Some(content) = &state.parts.content {
                content.set_hidden(true);
            }
        }

        tracing::debug!(target: targets::SELECT, tag = %self.host.tag(), "select disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.wiring.lock().connected
    }

    fn listen(&self, kind: &str, handler: fn(&Select, &Event)) -> ListenerId {
        let this = self.this.clone();
        self.host.add_event_listener(kind, move |event: &Event| {
            if let Some(select) = this.upgrade() {
                handler(&select, event);
            }
        })
    }

    // ------------------------------------------------------------------------
    // Open / close
    // ------------------------------------------------------------------------

    /// Open the popup.
    ///
    /// A no-op when disabled, already open, mid-transition, or without a
    /// content part. The open state flips right after `before-open`, before
    /// any claimed animation completes; initial focus and the outside-click
    /// listener follow at the next microtask checkpoint.
    pub fn open(&self) -> TransitionHandle {
        safe_call("Select::open", || self.try_open()).unwrap_or_else(skipped)
    }

    fn try_open(&self) -> Result<TransitionHandle> {
        let (trigger, content) = {
            let state = self.state.lock();
            if state.config.disabled || state.open || self.gate.is_animating() {
                tracing::trace!(target: targets::SELECT, open = state.open, "open skipped");
                return Ok(skipped());
            }
            let content = state.parts.require_content(&self.host)?.clone();
            (state.parts.trigger.clone(), content)
        };

        let pending = self.gate.announce(&self.host, TransitionKind::Open, |completion| BeforeOpenDetail {
            trigger: trigger.clone(),
            content: content.clone(),
            completion,
        });

        let (icon, rotation) = {
            let mut state = self.state.lock();
            state.open = true;
            content.set_hidden(false);
            self.apply_aria(&state);
            let rotation = state.config.icon_rotation;
            if let Some(icon) = &state.parts.icon {
                icon.set_attribute(DATA_ROTATION, rotation.to_string());
            }
            if state.config.scroll_lock
                && !state.scroll_locked
                && let Some(document) = self.document()
            {
                document.lock_scroll();
                state.scroll_locked = true;
            }
            (state.parts.icon.clone(), rotation)
        };
        tracing::debug!(target: targets::SELECT, claimed = pending.is_claimed(), "select opening");

        self.emit(names::ICON_ROTATE, IconRotateDetail { icon, rotation });
        self.emit(names::STATE_CHANGE, StateChangeDetail { open: true });

        let this = self.this.clone();
        Ok(pending.finish(move |_| {
            if let Some(select) = this.upgrade() {
                select.finish_open(trigger, content);
            }
        }))
    }

    fn finish_open(&self, trigger: Option<Element>, content: Element) {
        self.emit(names::AFTER_OPEN, AfterOpenDetail { trigger, content });

        // Deferred so the click that opened the popup finishes propagating
        // before the outside-click listener exists.
        let this = self.this.clone();
        let settle = move || {
            if let Some(select) = this.upgrade() {
                select.settle_open();
            }
        };
        match self.document() {
            Some(document) => {
                document.queue_microtask(settle);
            }
            None => settle(),
        }
    }

    fn settle_open(&self) {
        let mut state = self.state.lock();
        if !state.open {
            return;
        }

        let items = self.items.items();
        let target = items
            .iter()
            .position(|item| item.is_navigable() && state.selection.has(&item.value()))
            .or_else(|| FocusNavigator::first_index(&items));
        let take_focus = state.parts.search.is_none();
        if let Some(index) = target {
            state.navigator.move_to(&items, index, take_focus);
        }
        if let Some(search) = &state.parts.search {
            search.focus();
        }

        if state.outside_click.is_none()
            && let Some(document) = self.document()
        {
            let this = self.this.clone();
            let listener = document.body().add_event_listener(event_names::CLICK, move |event: &Event| {
                if let Some(select) = this.upgrade() {
                    select.handle_outside_click(event);
                }
            });
            state.outside_click = Some(listener);
        }
    }

    /// Close the popup.
    ///
    /// A no-op when already closed or mid-transition. Focus, type-ahead and
    /// the outside-click listener are reset right away; the content is hidden,
    /// the scroll lock released and focus returned to the trigger once the
    /// transition settles.
    pub fn close(&self) -> TransitionHandle {
        safe_call("Select::close", || self.try_close()).unwrap_or_else(skipped)
    }

    fn try_close(&self) -> Result<TransitionHandle> {
        let (trigger, content) = {
            let state = self.state.lock();
            if !state.open || self.gate.is_animating() {
                tracing::trace!(target: targets::SELECT, open = state.open, "close skipped");
                return Ok(skipped());
            }
            let content = state.parts.require_content(&self.host)?.clone();
            (state.parts.trigger.clone(), content)
        };

        let pending = self.gate.announce(&self.host, TransitionKind::Close, |completion| BeforeCloseDetail {
            trigger: trigger.clone(),
            content: content.clone(),
            completion,
        });

        let (icon, outside_click, type_ahead_timer) = {
            let mut state = self.state.lock();
            state.open = false;
            self.apply_aria(&state);
            if let Some(icon) = &state.parts.icon {
                icon.set_attribute(DATA_ROTATION, "0");
            }
            let items = self.items.items();
            state.navigator.reset(&items);
            state.type_ahead.clear();
            (
                state.parts.icon.clone(),
                state.outside_click.take(),
                state.type_ahead_timer.take(),
            )
        };
        if let Some(document) = self.document() {
            if let Some(listener) = outside_click {
                document.body().remove_event_listener(&listener);
            }
            if let Some(timer) = type_ahead_timer {
                document.clear_timeout(timer);
            }
        }
        tracing::debug!(target: targets::SELECT, claimed = pending.is_claimed(), "select closing");

        self.emit(names::ICON_ROTATE, IconRotateDetail { icon, rotation: 0.0 });
        self.emit(names::STATE_CHANGE, StateChangeDetail { open: false });

        let this = self.this.clone();
        Ok(pending.finish(move |_| {
            if let Some(select) = this.upgrade() {
                select.finish_close(trigger, content);
            }
        }))
    }

    fn finish_close(&self, trigger: Option<Element>, content: Element) {
        content.set_hidden(true);
        let unlock = std::mem::take(&mut self.state.lock().scroll_locked);
        if unlock && let Some(document) = self.document() {
            document.unlock_scroll();
        }
        if let Some(trigger) = &trigger {
            trigger.focus();
        }
        self.emit(names::AFTER_CLOSE, AfterCloseDetail { trigger, content });
    }

    /// Open when closed, close when open.
    pub fn toggle(&self) -> TransitionHandle {
        if self.is_open() { self.close() } else { self.open() }
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Select `element`, the item itself or any element inside it.
    ///
    /// A no-op for disabled items, elements outside every item, or a disabled
    /// host. Multiple selects toggle the item; single selects replace the
    /// selection. Closes afterwards when `close-on-select` is set.
    pub fn select_item(&self, element: &Element) -> TransitionHandle {
        safe_call("Select::select_item", || self.try_select_item(element)).unwrap_or_else(skipped)
    }

    fn try_select_item(&self, element: &Element) -> Result<TransitionHandle> {
        let Some(index) = self.items.index_of(element) else {
            tracing::debug!(target: targets::SELECT, tag = %element.tag(), "not an item of this select");
            return Ok(skipped());
        };
        let Some(item) = self.items.get(index) else {
            return Ok(skipped());
        };
        if self.state.lock().config.disabled || item.is_disabled() {
            tracing::trace!(target: targets::SELECT, index, "selection of disabled item skipped");
            return Ok(skipped());
        }

        let value = item.value();
        let pending = self.gate.announce(&self.host, TransitionKind::Select, |completion| BeforeSelectDetail {
            item: item.element().clone(),
            value: value.clone(),
            completion,
        });

        let this = self.this.clone();
        Ok(pending.finish(move |_| {
            if let Some(select) = this.upgrade() {
                select.finish_select(item, value);
            }
        }))
    }

    fn finish_select(&self, item: Item, value: String) {
        let (selected, changed, close) = {
            let mut state = self.state.lock();
            let before = state.selection.values().to_vec();
            let selected = state.selection.select(&value);
            let changed = state.selection.values() != before.as_slice();

            let items = self.items.items();
            self.refresh_items(&state, &items);
            self.refresh_display(&state, &items);
            (selected, changed, state.config.close_on_select && state.open)
        };
        tracing::debug!(target: targets::SELECT, %value, selected, "item selected");

        self.emit(
            names::AFTER_SELECT,
            AfterSelectDetail {
                item: item.element().clone(),
                value,
                selected,
            },
        );
        if changed {
            self.emit_value_change();
        }
        if close {
            self.close();
        }
    }

    /// Select the focused item, if any.
    pub fn select_focused_item(&self) -> TransitionHandle {
        let focused = self.state.lock().navigator.focused();
        match focused.and_then(|index| self.items.get(index)) {
            Some(item) => self.select_item(item.element()),
            None => skipped(),
        }
    }

    /// The first selected value.
    pub fn get_value(&self) -> Option<String> {
        self.state.lock().selection.first().map(str::to_string)
    }

    /// Every selected value.
    pub fn get_values(&self) -> Vec<String> {
        self.state.lock().selection.values().to_vec()
    }

    /// Replace the selection with `value`; an empty string clears it.
    ///
    /// No transition events are dispatched. Returns whether the selection
    /// changed.
    pub fn set_value(&self, value: &str) -> bool {
        if value.is_empty() {
            self.set_values::<[&str; 0], &str>([])
        } else {
            self.set_values([value])
        }
    }

    /// Replace the selection with `values`. Single selects keep the first.
    pub fn set_values<I, S>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let changed = {
            let mut state = self.state.lock();
            let before = state.selection.values().to_vec();
            state.selection.replace_all(values);
            let changed = state.selection.values() != before.as_slice();
            if changed {
                let items = self.items.items();
                self.refresh_items(&state, &items);
                self.refresh_display(&state, &items);
            }
            changed
        };
        if changed {
            self.emit_value_change();
        }
        changed
    }

    pub fn clear_selection(&self) -> bool {
        self.set_values::<[&str; 0], &str>([])
    }

    /// Whether the select satisfies `required`.
    pub fn check_validity(&self) -> bool {
        let state = self.state.lock();
        !(state.config.required && state.selection.is_empty())
    }

    // ------------------------------------------------------------------------
    // Focus navigation
    // ------------------------------------------------------------------------

    pub fn focus_next_item(&self) -> bool {
        self.move_focus(FocusNavigator::next)
    }

    pub fn focus_previous_item(&self) -> bool {
        self.move_focus(FocusNavigator::previous)
    }

    pub fn focus_first_item(&self) -> bool {
        self.move_focus(FocusNavigator::first)
    }

    pub fn focus_last_item(&self) -> bool {
        self.move_focus(FocusNavigator::last)
    }

    /// DOM focus follows the focused item unless the search field has it.
    fn move_focus(&self, step: fn(&mut FocusNavigator, &[Item], bool) -> Option<usize>) -> bool {
        let mut state = self.state.lock();
        let items = self.items.items();
        let take_focus = !state.parts.search_focused();
        step(&mut state.navigator, &items, take_focus).is_some()
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.state.lock().navigator.focused()
    }

    /// Offer one typed character to type-ahead.
    ///
    /// Rejected unless `input` is exactly one printable character, the popup
    /// is open and the search field does not have focus. Every accepted
    /// keystroke re-arms the buffer reset timer. Returns whether an item was
    /// focused.
    pub fn handle_type_ahead(&self, input: &str) -> bool {
        let mut chars = input.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            return false;
        };
        if ch.is_control() {
            return false;
        }

        let mut state = self.state.lock();
        if !state.open || state.parts.search_focused() {
            return false;
        }

        let items = self.items.items();
        let focused = state.navigator.focused();
        let found = state.type_ahead.find(ch, &items, focused);

        if let Some(document) = self.document() {
            if let Some(timer) = state.type_ahead_timer.take() {
                document.clear_timeout(timer);
            }
            let this = self.this.clone();
            let timer = document.set_timeout(TYPE_AHEAD_RESET, move || {
                if let Some(select) = this.upgrade() {
                    let mut state = select.state.lock();
                    state.type_ahead.clear();
                    state.type_ahead_timer = None;
                }
            });
            state.type_ahead_timer = Some(timer);
        }

        match found {
            Some(index) => state.navigator.move_to(&items, index, true),
            None => false,
        }
    }

    /// The current type-ahead buffer.
    pub fn type_ahead_buffer(&self) -> String {
        self.state.lock().type_ahead.buffer().to_string()
    }

    // ------------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------------

    /// Show only the items whose text contains `query`, case-insensitively.
    ///
    /// An empty query shows every item. If the focused item is hidden, focus
    /// moves to the first navigable item, or is dropped. Dispatches
    /// `items-filtered`.
    pub fn filter_items(&self, query: &str) -> FilterOutcome {
        let (outcome, query) = {
            let mut state = self.state.lock();
            let items = self.items.items();
            let outcome = state.filter.apply(&items, query);
            Self::keep_focus_visible(&mut state, &items);
            Self::apply_empty(&state, outcome);
            (outcome, state.filter.query().to_string())
        };
        tracing::trace!(target: targets::SELECT, %query, visible = outcome.visible, total = outcome.total, "items filtered");

        self.emit(
            names::ITEMS_FILTERED,
            ItemsFilteredDetail {
                query,
                visible: outcome.visible,
                total: outcome.total,
            },
        );
        outcome
    }

    pub fn filter_query(&self) -> String {
        self.state.lock().filter.query().to_string()
    }

    /// Move focus off an item the filter hid, to the first navigable item
    /// or nowhere.
    fn keep_focus_visible(state: &mut SelectState, items: &[Item]) {
        if let Some(focused) = state.navigator.focused()
            && !items.get(focused).is_some_and(Item::is_visible)
        {
            match FocusNavigator::first_index(items) {
                Some(first) => {
                    state.navigator.move_to(items, first, false);
                }
                None => state.navigator.reset(items),
            }
        }
    }

        fn apply_empty(state: &SelectState, outcome: FilterOutcome) {
        if let Some(empty) = &state.parts.empty {
            empty.set_hidden(outcome.visible > 0 || !state.filter.is_active());
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn is_multiple(&self) -> bool {
        self.state.lock().selection.is_multiple()
    }

    /// Whether an open or close transition is waiting on its animation.
    pub fn is_animating(&self) -> bool {
        self.gate.is_animating()
    }

    /// The item elements in document order.
    pub fn items(&self) -> Vec<Element> {
        self.items.items().iter().map(|item| item.element().clone()).collect()
    }

    /// How many times the item list has been enumerated.
    pub fn item_enumerations(&self) -> usize {
        self.items.enumeration_count()
    }

    pub fn config(&self) -> SelectConfig {
        self.state.lock().config.clone()
    }

    // ------------------------------------------------------------------------
    // DOM events
    // ------------------------------------------------------------------------

    fn handle_click(&self, event: &Event) {
        let Some(target) = event.target() else {
            return;
        };
        let (disabled, trigger) = {
            let state = self.state.lock();
            (state.config.disabled, state.parts.trigger.clone())
        };
        if disabled {
            return;
        }

        if let Some(index) = self.items.index_of(&target)
            && let Some(item) = self.items.get(index)
        {
            self.select_item(item.element());
        } else if trigger.is_some_and(|trigger| trigger.contains(&target)) {
            self.toggle();
        }
    }

    fn handle_outside_click(&self, event: &Event) {
        let inside = event.target().is_some_and(|target| self.host.contains(&target));
        if !inside && self.is_open() {
            tracing::trace!(target: targets::SELECT, "outside click");
            self.close();
        }
    }

    fn handle_keydown(&self, event: &Event) {
        let Some(keyboard) = event.keyboard() else {
            return;
        };
        let (open, search_focused, disabled) = {
            let state = self.state.lock();
            (state.open, state.parts.search_focused(), state.config.disabled)
        };
        if disabled {
            return;
        }

        let action = keyboard::route(keyboard, open, search_focused);
        let handled = match action {
            KeyAction::Open => {
                self.open();
                true
            }
            KeyAction::Close | KeyAction::CloseAndContinue => {
                self.close();
                true
            }
            KeyAction::SelectFocused => {
                self.select_focused_item();
                true
            }
            KeyAction::Next => self.focus_next_item(),
            KeyAction::Previous => self.focus_previous_item(),
            KeyAction::First => self.focus_first_item(),
            KeyAction::Last => self.focus_last_item(),
            KeyAction::TypeAhead(ch) => self.handle_type_ahead(ch.encode_utf8(&mut [0; 4])),
            KeyAction::Ignore => false,
        };

        if action.consumes_key() || (handled && matches!(action, KeyAction::TypeAhead(_))) {
            event.prevent_default();
        }
    }

    fn handle_input(&self, event: &Event) {
        let Some(value) = event.input_value() else {
            return;
        };
        let search = self.state.lock().parts.search.clone();
        if search.is_some_and(|search| event.target().as_ref() == Some(&search)) {
            self.filter_items(value);
        }
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// One batch of child-list mutations: one re-enumeration, one refresh
    /// and one `items-changed`.
    fn handle_structure(&self, records: &[MutationRecord]) {
        let mutations: Vec<MutationRecord> =
            records.iter().filter(|record| record.is_child_list()).cloned().collect();
        if mutations.is_empty() {
            return;
        }

        let focused_element = {
            let state = self.state.lock();
            state
                .navigator
                .focused()
                .and_then(|index| self.items.get(index))
                .map(|item| item.element().clone())
        };
        self.items.invalidate();
        let count = {
            let mut state = self.state.lock();
            let parts = Parts::discover(&self.host);
            if parts.content != state.parts.content
                && let Some(content) = &parts.content
            {
                content.set_hidden(!state.open);
            }
            state.parts = parts;

            let items = self.items.items();
            state.navigator.retarget(focused_element.as_ref(), &items);
            if state.filter.is_active() {
                let outcome = state.filter.reapply(&items);
                Self::keep_focus_visible(&mut state, &items);
                Self::apply_empty(&state, outcome);
            }
            self.apply_aria(&state);
            self.refresh_items(&state, &items);
            self.refresh_display(&state, &items);
            items.len()
        };
        tracing::debug!(target: targets::SELECT, count, mutations = mutations.len(), "items changed");

        self.emit(names::ITEMS_CHANGED, ItemsChangedDetail { count, mutations });
    }

    /// Re-derive the configuration from the host attributes.
    fn handle_attributes(&self, _records: &[MutationRecord]) {
        let config = SelectConfig::from_element(&self.host);
        self.gate.set_timeout(config.animation_timeout);

        let (close, changed) = {
            let mut state = self.state.lock();
            let before = state.selection.values().to_vec();
            state.selection.set_multiple(config.multiple);
            let became_disabled = config.disabled && !state.config.disabled;
            state.config = config;

            let changed = state.selection.values() != before.as_slice();
            let items = self.items.items();
            self.apply_aria(&state);
            if changed {
                self.refresh_items(&state, &items);
            }
            self.refresh_display(&state, &items);
            (became_disabled && state.open, changed)
        };
        tracing::debug!(target: targets::SELECT, close, changed, "configuration updated");

        if changed {
            self.emit_value_change();
        }
        if close {
            self.close();
        }
    }

    // ------------------------------------------------------------------------
    // Attribute output
    // ------------------------------------------------------------------------

    fn apply_aria(&self, state: &SelectState) {
        let open = state.open;
        let config = &state.config;
        self.host.set_attribute(DATA_STATE, state_name(open));
        self.host.toggle_attribute("data-disabled", config.disabled);

        let content_id = state.parts.content.as_ref().map(|content| {
            if let Some(id) = content.attribute("id") {
                return id;
            }
            let id = format!("horizon-select-content-{}", content.id().as_u64());
            content.set_attribute("id", id.clone());
            id
        });

        if let Some(trigger) = &state.parts.trigger {
            trigger.set_attribute("aria-haspopup", "listbox");
            trigger.set_attribute("aria-expanded", bool_attr(open));
            trigger.set_attribute("aria-required", bool_attr(config.required));
            trigger.set_attribute(DATA_STATE, state_name(open));
            if config.disabled {
                trigger.set_attribute("aria-disabled", "true");
            } else {
                trigger.remove_attribute("aria-disabled");
            }
            if let Some(id) = &content_id {
                trigger.set_attribute("aria-controls", id.as_str());
            }
        }
        if let Some(content) = &state.parts.content {
            content.set_attribute("role", "listbox");
            content.set_attribute("aria-multiselectable", bool_attr(config.multiple));
            content.set_attribute(DATA_STATE, state_name(open));
        }
    }

    fn refresh_items(&self, state: &SelectState, items: &[Item]) {
        for (index, item) in items.iter().enumerate() {
            let element = item.element();
            let selected = state.selection.has(&item.value());
            let focused = state.navigator.is_focused(index);

            element.set_attribute("role", "option");
            element.set_attribute("aria-selected", bool_attr(selected));
            element.toggle_attribute(SELECTED, selected);
            element.toggle_attribute(HIGHLIGHTED, focused);
            element.set_attribute("tabindex", if focused { "0" } else { "-1" });
            if item.is_disabled() {
                element.set_attribute("aria-disabled", "true");
            } else {
                element.remove_attribute("aria-disabled");
            }
        }
    }

    fn refresh_display(&self, state: &SelectState, items: &[Item]) {
        let Some(value) = &state.parts.value else {
            return;
        };

        let labels: Vec<String> = state
            .selection
            .values()
            .iter()
            .map(|selected| {
                items
                    .iter()
                    .find(|item| item.value() == *selected)
                    .map_or_else(|| selected.clone(), Item::text)
            })
            .collect();

        if labels.is_empty() {
            let placeholder = if state.config.placeholder.is_empty() {
                &state.authored_placeholder
            } else {
                &state.config.placeholder
            };
            value.set_text(placeholder.as_str());
            value.set_attribute(DATA_PLACEHOLDER, "");
        } else {
            value.set_text(labels.join(", "));
            value.remove_attribute(DATA_PLACEHOLDER);
        }
    }

    fn emit<D>(&self, kind: &str, detail: D)
    where
        D: Any + Send + Sync,
    {
        self.host.dispatch_event(Event::custom(kind, detail, false));
    }

    fn emit_value_change(&self) {
        let values = self.get_values();
        self.emit(
            names::VALUE_CHANGE,
            ValueChangeDetail {
                value: values.first().cloned(),
                values,
            },
        );
    }
}

impl CustomElement for Select {
    fn connected(&self) {
        self.connect();
    }

    fn disconnected(&self) {
        self.disconnect();
    }
}

impl Drop for Select {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Select")
            .field("host", &self.host)
            .field("open", &state.open)
            .field("values", &state.selection.values())
            .field("focused", &state.navigator.focused())
            .finish()
    }
}

static_assertions::assert_impl_all!(Select: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn item(value: &str, text: &str) -> Element {
        Element::new("div")
            .with_attribute(parts::ITEM, "")
            .with_attribute("value", value)
            .with_text(text)
    }

    fn fixture(document: &Document) -> Element {
        let host = Element::new("horizon-select")
            .with_child(
                Element::new("button")
                    .with_attribute(parts::TRIGGER, "")
                    .with_child(Element::new("span").with_attribute(parts::VALUE, "").with_text("Pick one"))
                    .with_child(Element::new("span").with_attribute(parts::ICON, "")),
            )
            .with_child(
                Element::new("div")
                    .with_attribute(parts::CONTENT, "")
                    .with_child(item("apple", "Apple"))
                    .with_child(item("banana", "Banana"))
                    .with_child(item("cherry", "Cherry")),
            );
        document.body().append_child(&host);
        host
    }

    fn value_part(host: &Element) -> Element {
        host.query_attribute(parts::VALUE).unwrap()
    }

    #[test]
    fn test_connect_writes_initial_state() {
        let document = Document::new();
        let host = fixture(&document);
        let select = Select::attach(host.clone());

        let content = host.query_attribute(parts::CONTENT).unwrap();
        let trigger = host.query_attribute(parts::TRIGGER).unwrap();
        assert!(content.is_hidden());
        assert_eq!(content.attribute("role").as_deref(), Some("listbox"));
        assert_eq!(trigger.attribute("aria-expanded").as_deref(), Some("false"));
        assert_eq!(trigger.attribute("aria-haspopup").as_deref(), Some("listbox"));
        assert_eq!(trigger.attribute("aria-controls"), content.attribute("id"));
        assert_eq!(host.attribute(DATA_STATE).as_deref(), Some("closed"));

        let items = select.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].attribute("role").as_deref(), Some("option"));
        assert_eq!(items[0].attribute("aria-selected").as_deref(), Some("false"));

        assert!(value_part(&host).has_attribute(DATA_PLACEHOLDER));
        assert_eq!(value_part(&host).text(), "Pick one");
        assert!(select.is_connected());
    }

    #[test]
    fn test_seeded_selection() {
        let document = Document::new();
        let host = fixture(&document);
        select_attr(&host, "banana");
        let select = Select::attach(host.clone());

        assert_eq!(select.get_value().as_deref(), Some("banana"));
        assert_eq!(value_part(&host).text(), "Banana");
        assert!(select.items()[1].has_attribute(SELECTED));
    }

    fn select_attr(host: &Element, value: &str) {
        for element in host.query_all(|e| e.attribute("value").as_deref() == Some(value)) {
            element.set_attribute("selected", "");
        }
    }

    #[test]
    fn test_open_then_focus_first_item() {
        let document = Document::new();
        let host = fixture(&document);
        let select = Select::attach(host.clone());

        let handle = select.open();
        assert_eq!(handle.settlement(), Some(Settlement::Immediate));
        assert!(select.is_open());
        assert!(document.is_scroll_locked());
        assert_eq!(
            host.query_attribute(parts::ICON).unwrap().attribute(DATA_ROTATION).as_deref(),
            Some("180")
        );

        document.run_microtasks();
        assert_eq!(select.focused_index(), Some(0));
        assert_eq!(document.active_element(), Some(select.items()[0].clone()));
        assert_eq!(document.body().listener_count(event_names::CLICK), 1);
    }

    #[test]
    fn test_open_focuses_selected_item() {
        let document = Document::new();
        let host = fixture(&document);
        let select = Select::attach(host);
        select.set_value("cherry");

        select.open();
        document.run_microtasks();
        assert_eq!(select.focused_index(), Some(2));
    }

    #[test]
    fn test_close_resets_state() {
        let document = Document::new();
        let host = fixture(&document);
        let select = Select::attach(host.clone());
        let trigger = host.query_attribute(parts::TRIGGER).unwrap();

        select.open();
        document.run_microtasks();
        select.close();

        assert!(!select.is_open());
        assert_eq!(select.focused_index(), None);
        assert!(host.query_attribute(parts::CONTENT).unwrap().is_hidden());
        assert!(!document.is_scroll_locked());
        assert_eq!(document.active_element(), Some(trigger));
        assert_eq!(document.body().listener_count(event_names::CLICK), 0);
        assert_eq!(select.close().settlement(), Some(Settlement::Skipped));
    }

    #[test]
    fn test_disabled_host_does_not_open() {
        let document = Document::new();
        let host = fixture(&document);
        host.set_attribute(attrs::DISABLED, "");
        let select = Select::attach(host);

        assert_eq!(select.open().settlement(), Some(Settlement::Skipped));
        assert!(!select.is_open());
    }

    #[test]
    fn test_missing_content_is_noop() {
        let document = Document::new();
        let host = Element::new("horizon-select").with_child(Element::new("button").with_attribute(parts::TRIGGER, ""));
        document.body().append_child(&host);
        let select = Select::attach(host);

        assert_eq!(select.open().settlement(), Some(Settlement::Skipped));
        assert!(!select.is_open());
    }

    #[test]
    fn test_disabled_item_is_not_selected() {
        let document = Document::new();
        let host = fixture(&document);
        let select = Select::attach(host);
        let banana = select.items()[1].clone();
        banana.set_attribute("disabled", "");

        assert_eq!(select.select_item(&banana).settlement(), Some(Settlement::Skipped));
        assert!(select.get_values().is_empty());
    }

    #[test]
    fn test_set_value_updates_display() {
        let document = Document::new();
        let host = fixture(&document);
        let select = Select::attach(host.clone());
        let changes = Arc::new(AtomicUsize::new(0));
        let changes_clone = changes.clone();
        host.add_event_listener(names::VALUE_CHANGE, move |_| {
            changes_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(select.set_value("apple"));
        assert!(!select.set_value("apple"));
        assert_eq!(value_part(&host).text(), "Apple");
        assert!(!value_part(&host).has_attribute(DATA_PLACEHOLDER));

        assert!(select.clear_selection());
        assert_eq!(value_part(&host).text(), "Pick one");
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unknown_value_is_displayed_verbatim() {
        let document = Document::new();
        let host = fixture(&document);
        let select = Select::attach(host.clone());

        select.set_values(["kiwi", "apple"]);
        assert_eq!(select.get_values(), vec!["kiwi".to_string()]);
        assert_eq!(value_part(&host).text(), "kiwi");
    }

    #[test]
    fn test_check_validity() {
        let document = Document::new();
        let host = fixture(&document);
        host.set_attribute(attrs::REQUIRED, "");
        let select = Select::attach(host.clone());

        assert!(!select.check_validity());
        assert_eq!(
            host.query_attribute(parts::TRIGGER).unwrap().attribute("aria-required").as_deref(),
            Some("true")
        );
        select.set_value("apple");
        assert!(select.check_validity());
    }

    #[test]
    fn test_type_ahead_requires_open() {
        let document = Document::with_manual_clock();
        let host = fixture(&document);
        let select = Select::attach(host);

        assert!(!select.handle_type_ahead("b"));
        select.open();
        assert!(select.handle_type_ahead("b"));
        assert_eq!(select.focused_index(), Some(1));
        assert!(!select.handle_type_ahead("bb"));
        assert!(!select.handle_type_ahead(""));
        assert!(!select.handle_type_ahead("\n"));
    }

    #[test]
    fn test_type_ahead_buffer_resets_after_idle() {
        let document = Document::with_manual_clock();
        let host = fixture(&document);
        let select = Select::attach(host);
        select.open();

        select.handle_type_ahead("c");
        assert_eq!(select.type_ahead_buffer(), "c");
        document.advance(Duration::from_millis(600));
        select.handle_type_ahead("c");
        document.advance(Duration::from_millis(600));
        assert_eq!(select.type_ahead_buffer(), "c");
        document.advance(Duration::from_millis(400));
        assert_eq!(select.type_ahead_buffer(), "");
    }

    #[test]
    fn test_drop_detaches_listeners() {
        let document = Document::new();
        let host = fixture(&document);
        let select = Select::attach(host.clone());
        assert_eq!(host.listener_count(event_names::CLICK), 1);
        assert_eq!(document.observer_count(), 2);

        drop(select);
        assert_eq!(host.listener_count(event_names::CLICK), 0);
        assert_eq!(document.observer_count(), 0);
    }
}
