//! Keyboard focus among the items.
//!
//! The navigator owns a single focused index. Moving it rewrites the focus
//! attributes of exactly two items, the one losing focus and the one gaining
//! it, so a keystroke costs the same regardless of list length.

use horizon_elements_core::Element;

use super::items::Item;

/// Attribute marking the focused item.
pub const HIGHLIGHTED: &str = "data-highlighted";

/// Tracks the focused item index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusNavigator {
    focused: Option<usize>,
}

impl FocusNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The focused index, if any.
    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    /// The first navigable index after the focused one. Does not wrap.
    pub fn next_index(&self, items: &[Item]) -> Option<usize> {
        let start = self.focused.map_or(0, |i| i + 1);
        (start..items.len()).find(|&i| items[i].is_navigable())
    }

    /// The last navigable index before the focused one. Does not wrap.
    ///
    /// With nothing focused this scans from the end.
    pub fn previous_index(&self, items: &[Item]) -> Option<usize> {
        let end = self.focused.unwrap_or(items.len()).min(items.len());
        (0..end).rev().find(|&i| items[i].is_navigable())
    }

    pub fn first_index(items: &[Item]) -> Option<usize> {
        items.iter().position(Item::is_navigable)
    }

    pub fn last_index(items: &[Item]) -> Option<usize> {
        items.iter().rposition(Item::is_navigable)
    }

    /// Focus the next navigable item. Returns the new index.
    pub fn next(&mut self, items: &[Item], take_focus: bool) -> Option<usize> {
        let index = self.next_index(items)?;
        self.move_to(items, index, take_focus);
        Some(index)
    }

    /// Focus the previous navigable item. Returns the new index.
    pub fn previous(&mut self, items: &[Item], take_focus: bool) -> Option<usize> {
        let index = self.previous_index(items)?;
        self.move_to(items, index, take_focus);
        Some(index)
    }

    /// Focus the first navigable item. Returns the new index.
    pub fn first(&mut self, items: &[Item], take_focus: bool) -> Option<usize> {
        let index = Self::first_index(items)?;
        self.move_to(items, index, take_focus);
        Some(index)
    }

    /// Focus the last navigable item. Returns the new index.
    pub fn last(&mut self, items: &[Item], take_focus: bool) -> Option<usize> {
        let index = Self::last_index(items)?;
        self.move_to(items, index, take_focus);
        Some(index)
    }

    /// Focus `index`, whatever its state.
    ///
    /// Only the previously focused item and the new one are touched. With
    /// `take_focus` the new item also becomes the document's active element.
    /// Returns `false` if `index` is out of range.
    pub fn move_to(&mut self, items: &[Item], index: usize, take_focus: bool) -> bool {
        let Some(target) = items.get(index) else {
            return false;
        };

        if let Some(previous) = self.focused
            && previous != index
            && let Some(item) = items.get(previous)
        {
            mark(item, false);
        }

        mark(target, true);
        if take_focus {
            target.element().focus();
        }
        self.focused = Some(index);
        true
    }

    /// Drop focus, clearing the focused item's attributes.
    pub fn reset(&mut self, items: &[Item]) {
        if let Some(previous) = self.focused.take()
            && let Some(item) = items.get(previous)
        {
            mark(item, false);
        }
    }

    /// Re-resolve the focus after the item list was rebuilt.
    ///
    /// Focus follows `element`, the item that held it before the change. If
    /// that element is no longer an item, nothing is focused.
    pub fn retarget(&mut self, element: Option<&Element>, items: &[Item]) {
        self.focused = element.and_then(|element| items.iter().position(|item| item.element() == element));
    }

    /// Whether `index` is the focused index.
    pub fn is_focused(&self, index: usize) -> bool {
        self.focused == Some(index)
    }
}

/// Write the focus attributes of one item.
pub(crate) fn mark(item: &Item, focused: bool) {
    let element = item.element();
    element.toggle_attribute(HIGHLIGHTED, focused);
    element.set_attribute("tabindex", if focused { "0" } else { "-1" });
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_elements_core::Document;

    fn items(spec: &[(&str, bool)]) -> Vec<Item> {
        spec.iter()
            .map(|(text, disabled)| {
                let element = Element::new("div").with_text(*text);
                if *disabled {
                    element.set_attribute("disabled", "");
                }
                Item::new(element)
            })
            .collect()
    }

    #[test]
    fn test_next_skips_disabled_without_wrapping() {
        let items = items(&[("a", true), ("b", false), ("c", true), ("d", false)]);
        let mut navigator = FocusNavigator::new();

        assert_eq!(navigator.next(&items, false), Some(1));
        assert_eq!(navigator.next(&items, false), Some(3));
        assert_eq!(navigator.next(&items, false), None);
        assert_eq!(navigator.focused(), Some(3));
    }

    #[test]
    fn test_previous_and_bounds() {
        let items = items(&[("a", false), ("b", true), ("c", false)]);
        let mut navigator = FocusNavigator::new();

        assert_eq!(navigator.previous(&items, false), Some(2));
        assert_eq!(navigator.previous(&items, false), Some(0));
        assert_eq!(navigator.previous(&items, false), None);
        assert_eq!(navigator.last(&items, false), Some(2));
        assert_eq!(navigator.first(&items, false), Some(0));
    }

    #[test]
    fn test_all_disabled_is_noop() {
        let items = items(&[("a", true), ("b", true)]);
        let mut navigator = FocusNavigator::new();

        assert_eq!(navigator.next(&items, false), None);
        assert_eq!(navigator.first(&items, false), None);
        assert_eq!(navigator.focused(), None);
    }

    #[test]
    fn test_filtered_items_are_skipped() {
        let items = items(&[("a", false), ("b", false), ("c", false)]);
        items[1].element().set_attribute(crate::select::items::FILTERED, "");
        let mut navigator = FocusNavigator::new();

        navigator.first(&items, false);
        assert_eq!(navigator.next(&items, false), Some(2));
    }

    #[test]
    fn test_move_touches_only_two_items() {
        let items = items(&[("a", false), ("b", false), ("c", false)]);
        let mut navigator = FocusNavigator::new();

        navigator.move_to(&items, 0, false);
        // An unrelated item keeps whatever attributes it had.
        items[2].element().set_attribute("tabindex", "untouched");

        navigator.move_to(&items, 1, false);
        assert!(!items[0].element().has_attribute(HIGHLIGHTED));
        assert_eq!(items[0].element().attribute("tabindex").as_deref(), Some("-1"));
        assert!(items[1].element().has_attribute(HIGHLIGHTED));
        assert_eq!(items[1].element().attribute("tabindex").as_deref(), Some("0"));
        assert_eq!(items[2].element().attribute("tabindex").as_deref(), Some("untouched"));

        assert!(!navigator.move_to(&items, 9, false));
        assert_eq!(navigator.focused(), Some(1));
    }

    #[test]
    fn test_take_focus_sets_active_element() {
        let document = Document::new();
        let items = items(&[("a", false), ("b", false)]);
        for item in &items {
            document.body().append_child(item.element());
        }

        let mut navigator = FocusNavigator::new();
        navigator.next(&items, true);
        assert_eq!(document.active_element(), Some(items[0].element().clone()));

        navigator.reset(&items);
        assert_eq!(navigator.focused(), None);
        assert!(!items[0].element().has_attribute(HIGHLIGHTED));
    }

    #[test]
    fn test_exogenous_index_is_tolerated() {
        let items = items(&[("a", false), ("b", true), ("c", false)]);
        let mut navigator = FocusNavigator::new();

        navigator.move_to(&items, 1, false);
        assert_eq!(navigator.next(&items, false), Some(2));

        navigator.move_to(&items, 2, false);
        navigator.retarget(None, &items[..2]);
        assert_eq!(navigator.focused(), None);
    }

    #[test]
    fn test_retarget_follows_focused_element() {
        let mut items = items(&[("a", false), ("b", false), ("c", false), ("d", false)]);
        let mut navigator = FocusNavigator::new();
        navigator.move_to(&items, 2, false);
        let focused = items[2].element().clone();

        items.remove(0);
        navigator.retarget(Some(&focused), &items);
        assert_eq!(navigator.focused(), Some(1));

        items.insert(0, Item::new(Element::new("div").with_text("z")));
        items.insert(0, Item::new(Element::new("div").with_text("y")));
        navigator.retarget(Some(&focused), &items);
        assert_eq!(navigator.focused(), Some(3));

        items.remove(3);
        navigator.retarget(Some(&focused), &items);
        assert_eq!(navigator.focused(), None);
    }
}
