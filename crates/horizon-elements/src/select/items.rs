//! Item enumeration and classification.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horizon_elements_core::Element;
use parking_lot::Mutex;

use super::parts;
use crate::logging::targets;

/// Attribute marking an item hidden by the filter.
pub const FILTERED: &str = "data-filtered";

/// One selectable option.
///
/// Classification is read from the element's attributes on every call, so
/// it always reflects the current filter and disabled state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    element: Element,
}

impl Item {
    pub fn new(element: Element) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Display text: `data-label`, falling back to the trimmed text content.
    pub fn text(&self) -> String {
        self.element
            .attribute("data-label")
            .unwrap_or_else(|| self.element.text_content().trim().to_string())
    }

    /// Value identifier: `value`, falling back to the display text.
    pub fn value(&self) -> String {
        self.element.attribute("value").unwrap_or_else(|| self.text())
    }

    /// Only the authored `disabled` attribute counts; `aria-disabled` is
    /// output written by the select.
    pub fn is_disabled(&self) -> bool {
        self.element.has_attribute("disabled")
    }

    /// Whether the filter left this item visible.
    pub fn is_visible(&self) -> bool {
        !self.element.has_attribute(FILTERED)
    }

    /// Whether keyboard navigation may land on this item.
    pub fn is_navigable(&self) -> bool {
        !self.is_disabled() && self.is_visible()
    }
}

/// Lazily enumerated list of a host's items.
///
/// The list is built on first use and reused until [`invalidate`] is called,
/// which the select does once per batch of structural mutations.
///
/// [`invalidate`]: ItemRegistry::invalidate
#[derive(Debug)]
pub struct ItemRegistry {
    host: Element,
    cache: Mutex<Option<Arc<[Item]>>>,
    enumerations: AtomicUsize,
}

impl ItemRegistry {
    pub fn new(host: Element) -> Self {
        Self {
            host,
            cache: Mutex::new(None),
            enumerations: AtomicUsize::new(0),
        }
    }

    /// The items in document order.
    pub fn items(&self) -> Arc<[Item]> {
        let mut cache = self.cache.lock();
        if let Some(items) = cache.as_ref() {
            return items.clone();
        }

        let items: Arc<[Item]> = self
            .host
            .query_all(|e| e.has_attribute(parts::ITEM))
            .into_iter()
            .map(Item::new)
            .collect();
        let count = self.enumerations.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(target: targets::SELECT, items = items.len(), enumeration = count, "items enumerated");

        *cache = Some(items.clone());
        items
    }

    /// Drop the cached list; the next access re-enumerates.
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    /// How many times the item list has been enumerated.
    pub fn enumeration_count(&self) -> usize {
        self.enumerations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Item> {
        self.items().get(index).cloned()
    }

    pub fn enabled_items(&self) -> Vec<Item> {
        self.items()
            .iter()
            .filter(|item| !item.is_disabled())
            .cloned()
            .collect()
    }

    pub fn visible_enabled_items(&self) -> Vec<Item> {
        self.items()
            .iter()
            .filter(|item| item.is_navigable())
            .cloned()
            .collect()
    }

    /// Index of the item that is `element` or contains it.
    pub fn index_of(&self, element: &Element) -> Option<usize> {
        let item = element.closest(|e| e.has_attribute(parts::ITEM))?;
        self.items().iter().position(|i| i.element == item)
    }

    /// The first item whose value is `value`.
    pub fn find_by_value(&self, value: &str) -> Option<(usize, Item)> {
        self.items()
            .iter()
            .enumerate()
            .find(|(_, item)| item.value() == value)
            .map(|(index, item)| (index, item.clone()))
    }
}
