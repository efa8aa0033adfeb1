//! Headless element tree.
//!
//! An [`Element`] is a cheap, clonable handle to a node with a tag name,
//! string attributes, its own text and an ordered list of child elements.
//! Parents own their children; children refer back to their parent and
//! document weakly, so dropping a subtree's last handle frees it.
//!
//! Elements attached to a [`Document`] report their attribute and child-list
//! changes to it for mutation observers. Every mutation is reported after the
//! element's own lock is released, so observers and listeners are free to
//! read and write the tree.
//!
//! # Example
//!
//! ```
//! use horizon_elements_core::Element;
//!
//! let list = Element::new("ul")
//!     .with_child(Element::new("li").with_attribute("value", "a").with_text("Alpha"))
//!     .with_child(Element::new("li").with_attribute("value", "b").with_text("Beta"));
//!
//! let beta = list.query(|e| e.attribute("value").as_deref() == Some("b")).unwrap();
//! assert_eq!(beta.text_content(), "Beta");
//! assert_eq!(beta.parent(), Some(list));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::document::{Document, DocumentInner};
use crate::event::Event;
use crate::logging::targets;
use crate::mutation::{MutationKind, MutationRecord};
use crate::safe_call::safe_call;
use crate::signal::{ConnectionId, Signal};

/// A unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    /// Get the raw u64 value of this element ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies an event listener registered with
/// [`Element::add_event_listener`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId {
    kind: String,
    connection: ConnectionId,
}

type EventSignal = Signal<Arc<Event>>;

#[derive(Default)]
struct ElementData {
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<Element>,
    parent: Weak<ElementInner>,
    document: Weak<DocumentInner>,
}

struct ElementInner {
    id: ElementId,
    tag: String,
    data: RwLock<ElementData>,
    listeners: Mutex<HashMap<String, Arc<EventSignal>>>,
}

/// A handle to a node in the element tree.
///
/// Two handles are equal when they refer to the same node.
#[derive(Clone)]
pub struct Element {
    inner: Arc<ElementInner>,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Element {}

impl std::hash::Hash for Element {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl Element {
    /// Create a detached element.
    ///
    /// The element joins a document when it is appended to an element that
    /// belongs to one.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ElementInner {
                id: ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed)),
                tag: tag.into().to_ascii_lowercase(),
                data: RwLock::new(ElementData::default()),
                listeners: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn from_inner(inner: Arc<ElementInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> ElementId {
        self.inner.id
    }

    /// The lowercase tag name.
    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    /// The document this element belongs to, if any.
    pub fn document(&self) -> Option<Document> {
        self.inner
            .data
            .read()
            .document
            .upgrade()
            .map(Document::from_inner)
    }

    pub(crate) fn set_document(&self, document: Weak<DocumentInner>) {
        self.inner.data.write().document = document;
    }

    /// Set the document of this element and all of its descendants.
    fn adopt(&self, document: &Weak<DocumentInner>) {
        self.set_document(document.clone());
        for child in self.children() {
            child.adopt(document);
        }
    }

    fn record(&self, kind: MutationKind) {
        if let Some(document) = self.document() {
            document.record_mutation(MutationRecord {
                target: self.clone(),
                kind,
            });
        }
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.data.read().attributes.get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.inner.data.read().attributes.contains_key(name)
    }

    /// Snapshot of all attributes.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.inner.data.read().attributes.clone()
    }

    /// Set an attribute. Setting the value it already has is not a mutation.
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let old_value = {
            let mut data = self.inner.data.write();
            if data.attributes.get(name) == Some(&value) {
                return;
            }
            data.attributes.insert(name.to_string(), value)
        };
        self.record(MutationKind::Attributes {
            name: name.to_string(),
            old_value,
        });
    }

    /// Remove an attribute. Returns `true` if it was present.
    pub fn remove_attribute(&self, name: &str) -> bool {
        let old_value = self.inner.data.write().attributes.remove(name);
        let removed = old_value.is_some();
        if removed {
            self.record(MutationKind::Attributes {
                name: name.to_string(),
                old_value,
            });
        }
        removed
    }

    /// Add (as an empty value) or remove a boolean attribute.
    pub fn toggle_attribute(&self, name: &str, present: bool) {
        if present {
            if !self.has_attribute(name) {
                self.set_attribute(name, "");
            }
        } else {
            self.remove_attribute(name);
        }
    }

    /// Whether the `hidden` attribute is present.
    pub fn is_hidden(&self) -> bool {
        self.has_attribute("hidden")
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.toggle_attribute("hidden", hidden);
    }

    // -------------------------------------------------------------------------
    // Text
    // -------------------------------------------------------------------------

    /// The element's own text, excluding its children.
    pub fn text(&self) -> String {
        self.inner.data.read().text.clone()
    }

    /// The element's own text followed by the text of its descendants.
    pub fn text_content(&self) -> String {
        let (mut text, children) = {
            let data = self.inner.data.read();
            (data.text.clone(), data.children.clone())
        };
        for child in children {
            text.push_str(&child.text_content());
        }
        text
    }

    /// Replace the element's own text, leaving child elements in place.
    pub fn set_text(&self, text: impl Into<String>) {
        self.inner.data.write().text = text.into();
    }

    // -------------------------------------------------------------------------
    // Tree
    // -------------------------------------------------------------------------

    pub fn parent(&self) -> Option<Element> {
        self.inner
            .data
            .read()
            .parent
            .upgrade()
            .map(Self::from_inner)
    }

    pub fn children(&self) -> Vec<Element> {
        self.inner.data.read().children.clone()
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self) -> Vec<Element> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(element) = current {
            current = element.parent();
            ancestors.push(element);
        }
        ancestors
    }

    /// The topmost ancestor, or `self` when detached.
    pub fn root(&self) -> Element {
        self.ancestors().pop().unwrap_or_else(|| self.clone())
    }

    /// Whether `other` is this element or one of its descendants.
    pub fn contains(&self, other: &Element) -> bool {
        if self == other {
            return true;
        }
        let mut current = other.parent();
        while let Some(element) = current {
            if &element == self {
                return true;
            }
            current = element.parent();
        }
        false
    }

    /// Whether this element is in its document's body tree.
    pub fn is_connected(&self) -> bool {
        self.document()
            .is_some_and(|document| document.body().contains(self))
    }

    /// All descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<Element> {
        let mut result = Vec::new();
        let mut stack: Vec<Element> = self.children().into_iter().rev().collect();
        while let Some(element) = stack.pop() {
            stack.extend(element.children().into_iter().rev());
            result.push(element);
        }
        result
    }

    /// The first descendant, in document order, matching `predicate`.
    pub fn query(&self, predicate: impl Fn(&Element) -> bool) -> Option<Element> {
        self.descendants().into_iter().find(|e| predicate(e))
    }

    /// Every descendant, in document order, matching `predicate`.
    pub fn query_all(&self, predicate: impl Fn(&Element) -> bool) -> Vec<Element> {
        self.descendants()
            .into_iter()
            .filter(|e| predicate(e))
            .collect()
    }

    /// The first descendant carrying the attribute `name`.
    pub fn query_attribute(&self, name: &str) -> Option<Element> {
        self.query(|e| e.has_attribute(name))
    }

    /// The nearest inclusive ancestor matching `predicate`.
    pub fn closest(&self, predicate: impl Fn(&Element) -> bool) -> Option<Element> {
        if predicate(self) {
            return Some(self.clone());
        }
        self.ancestors().into_iter().find(|e| predicate(e))
    }

    /// Append `child` as the last child, moving it from its old parent.
    ///
    /// Appending an element to itself or to one of its descendants is
    /// rejected.
    pub fn append_child(&self, child: &Element) {
        if child.contains(self) {
            tracing::warn!(
                target: targets::CORE,
                parent = %self.tag(),
                child = %child.tag(),
                "refusing to append an element into its own subtree"
            );
            return;
        }
        if let Some(old_parent) = child.parent() {
            old_parent.remove_child(child);
        }

        let document = {
            let mut data = self.inner.data.write();
            data.children.push(child.clone());
            data.document.clone()
        };
        child.inner.data.write().parent = Arc::downgrade(&self.inner);
        child.adopt(&document);

        self.record(MutationKind::ChildList {
            added: vec![child.clone()],
            removed: Vec::new(),
        });
    }

    /// Remove `child` from this element. Returns `false` if it is not a child.
    pub fn remove_child(&self, child: &Element) -> bool {
        let removed = {
            let mut data = self.inner.data.write();
            match data.children.iter().position(|c| c == child) {
                Some(index) => {
                    data.children.remove(index);
                    true
                }
                None => false,
            }
        };
        if !removed {
            return false;
        }
        child.inner.data.write().parent = Weak::new();

        // The child keeps its document so it can be re-inserted, but it is no
        // longer connected; drop focus if it was holding it.
        if let Some(document) = self.document() {
            document.blur_within(child);
        }

        self.record(MutationKind::ChildList {
            added: Vec::new(),
            removed: vec![child.clone()],
        });
        true
    }

    /// Detach this element from its parent.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    // -------------------------------------------------------------------------
    // Focus
    // -------------------------------------------------------------------------

    /// Make this element the document's active element.
    pub fn focus(&self) {
        if let Some(document) = self.document() {
            document.set_active_element(Some(self.clone()));
        }
    }

    /// Clear focus if this element holds it.
    pub fn blur(&self) {
        if let Some(document) = self.document()
            && document.active_element().as_ref() == Some(self)
        {
            document.set_active_element(None);
        }
    }

    pub fn is_focused(&self) -> bool {
        self.document()
            .and_then(|document| document.active_element())
            .is_some_and(|active| &active == self)
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Register a listener for events of type `kind` reaching this element.
    ///
    /// A panicking listener is contained and logged; the remaining listeners
    /// still run.
    pub fn add_event_listener<F>(&self, kind: &str, listener: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let signal = self
            .inner
            .listeners
            .lock()
            .entry(kind.to_string())
            .or_default()
            .clone();

        let context = format!("{} listener on <{}>", kind, self.tag());
        let connection = signal.connect(move |event: &Arc<Event>| {
            safe_call(&context, || {
                listener(&**event);
                Ok(())
            });
        });

        ListenerId {
            kind: kind.to_string(),
            connection,
        }
    }

    /// Remove a listener. Returns `false` if it was not registered here.
    pub fn remove_event_listener(&self, id: &ListenerId) -> bool {
        let signal = self.inner.listeners.lock().get(&id.kind).cloned();
        signal.is_some_and(|signal| signal.disconnect(id.connection))
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: &str) -> usize {
        self.inner
            .listeners
            .lock()
            .get(kind)
            .map_or(0, |signal| signal.connection_count())
    }

    /// Dispatch `event` to this element and, if it bubbles, its ancestors.
    ///
    /// Returns the event so the caller can inspect
    /// [`Event::default_prevented`]. Microtasks queued by listeners are not
    /// run; use [`Document::dispatch_event`] for a dispatch followed by a
    /// microtask checkpoint.
    pub fn dispatch_event(&self, event: Event) -> Arc<Event> {
        let event = Arc::new(event);
        event.set_target(self);

        let mut path = vec![self.clone()];
        if event.bubbles() {
            path.extend(self.ancestors());
        }

        tracing::trace!(
            target: targets::DOCUMENT,
            kind = event.kind(),
            target_tag = %self.tag(),
            path_len = path.len(),
            "dispatching event"
        );

        for element in &path {
            let signal = element.inner.listeners.lock().get(event.kind()).cloned();
            let Some(signal) = signal else {
                continue;
            };
            event.set_current_target(Some(element));
            signal.emit_while(&event, || !event.immediate_propagation_stopped());
            if event.propagation_stopped() {
                break;
            }
        }
        event.set_current_target(None);
        event
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    pub fn with_attribute(self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub fn with_child(self, child: Element) -> Self {
        self.append_child(&child);
        self
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.inner.data.read();
        f.debug_struct("Element")
            .field("id", &self.inner.id.0)
            .field("tag", &self.inner.tag)
            .field("attributes", &data.attributes)
            .field("children", &data.children.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(Element: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn list() -> (Element, Element, Element) {
        let root = Element::new("div");
        let a = Element::new("span").with_text("a");
        let b = Element::new("span").with_text("b");
        root.append_child(&a);
        root.append_child(&b);
        (root, a, b)
    }

    #[test]
    fn test_attributes() {
        let element = Element::new("DIV");
        assert_eq!(element.tag(), "div");

        element.set_attribute("role", "listbox");
        assert_eq!(element.attribute("role").as_deref(), Some("listbox"));

        element.toggle_attribute("hidden", true);
        assert!(element.is_hidden());
        assert_eq!(element.attribute("hidden").as_deref(), Some(""));

        assert!(element.remove_attribute("hidden"));
        assert!(!element.remove_attribute("hidden"));
        assert!(!element.is_hidden());
    }

    #[test]
    fn test_tree_navigation() {
        let (root, a, b) = list();
        let nested = Element::new("em").with_text("!");
        b.append_child(&nested);

        assert_eq!(root.children(), vec![a.clone(), b.clone()]);
        assert_eq!(root.descendants(), vec![a.clone(), b.clone(), nested.clone()]);
        assert_eq!(root.text_content(), "ab!");
        assert_eq!(nested.ancestors(), vec![b.clone(), root.clone()]);
        assert_eq!(nested.root(), root);
        assert!(root.contains(&nested));
        assert!(!a.contains(&nested));
        assert_eq!(nested.closest(|e| e.tag() == "div"), Some(root.clone()));
    }

    #[test]
    fn test_append_moves_between_parents() {
        let (root, a, _) = list();
        let other = Element::new("section");
        other.append_child(&a);

        assert_eq!(root.children().len(), 1);
        assert_eq!(a.parent(), Some(other));
    }

    #[test]
    fn test_append_into_own_subtree_is_rejected() {
        let (root, a, _) = list();
        a.append_child(&root);
        assert!(root.parent().is_none());
        assert!(a.children().is_empty());
    }

    #[test]
    fn test_dispatch_bubbles_until_stopped() {
        let (root, a, _) = list();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_a = seen.clone();
        a.add_event_listener("click", move |_| {
            seen_a.lock().push("a");
        });
        let seen_root = seen.clone();
        let root_listener = root.add_event_listener("click", move |_| {
            seen_root.lock().push("root");
        });

        let event = a.dispatch_event(Event::click());
        assert_eq!(*seen.lock(), vec!["a", "root"]);
        assert_eq!(event.target(), Some(a.clone()));
        assert!(event.current_target().is_none());

        let stopper = a.add_event_listener("click", |event| event.stop_propagation());
        a.dispatch_event(Event::click());
        assert_eq!(*seen.lock(), vec!["a", "root", "a"]);

        assert!(a.remove_event_listener(&stopper));
        assert!(root.remove_event_listener(&root_listener));
        assert!(!root.remove_event_listener(&root_listener));
        assert_eq!(root.listener_count("click"), 0);
    }

    #[test]
    fn test_panicking_listener_is_contained() {
        let element = Element::new("button");
        let calls = Arc::new(AtomicUsize::new(0));

        element.add_event_listener("click", |_| panic!("listener failure"));
        let calls_clone = calls.clone();
        element.add_event_listener("click", move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        element.dispatch_event(Event::click());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_bubbling_event_stays_on_target() {
        let (root, a, _) = list();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        root.add_event_listener("focus", move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        a.dispatch_event(Event::new("focus", Default::default()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
