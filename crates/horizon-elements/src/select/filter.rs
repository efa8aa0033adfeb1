//! Live substring filtering of items.

use super::items::{FILTERED, Item};

/// Trim and lowercase a filter query.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Counts reported after a filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Items left visible.
    pub visible: usize,
    /// All items.
    pub total: usize,
}

/// The active filter query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterEngine {
    query: String,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The normalized query; empty when no filter is active.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// Normalize `query`, store it and apply it to `items`.
    pub fn apply(&mut self, items: &[Item], query: &str) -> FilterOutcome {
        self.query = normalize_query(query);
        self.reapply(items)
    }

    /// Apply the stored query to `items`, e.g. after items were added.
    ///
    /// Visibility is independent of the disabled state: an empty query shows
    /// every item.
    pub fn reapply(&self, items: &[Item]) -> FilterOutcome {
        let mut visible = 0;
        for item in items {
            let shown = self.matches(item);
            let element = item.element();
            element.toggle_attribute(FILTERED, !shown);
            element.set_hidden(!shown);
            if shown {
                visible += 1;
            }
        }
        FilterOutcome {
            visible,
            total: items.len(),
        }
    }

    /// Whether `item` passes the stored query.
    pub fn matches(&self, item: &Item) -> bool {
        self.query.is_empty() || item.text().to_lowercase().contains(&self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_elements_core::Element;

    fn items(texts: &[&str]) -> Vec<Item> {
        texts
            .iter()
            .map(|text| Item::new(Element::new("div").with_text(*text)))
            .collect()
    }

    #[test]
    fn test_substring_case_insensitive() {
        let items = items(&["Apple", "Cherry", "Peach", "Banana"]);
        let mut filter = FilterEngine::new();

        let outcome = filter.apply(&items, "  CH ");
        assert_eq!(filter.query(), "ch");
        assert_eq!(outcome, FilterOutcome { visible: 2, total: 4 });

        assert!(!items[0].is_visible());
        assert!(items[0].element().is_hidden());
        assert!(items[1].is_visible());
        assert!(items[2].is_visible());
        assert!(!items[3].is_visible());
    }

    #[test]
    fn test_empty_query_restores_everything() {
        let items = items(&["Apple", "Cherry", "Banana"]);
        items[2].element().set_attribute("disabled", "");
        let mut filter = FilterEngine::new();

        filter.apply(&items, "ch");
        let outcome = filter.apply(&items, "");

        assert!(!filter.is_active());
        assert_eq!(outcome.visible, 3);
        for item in &items {
            assert!(item.is_visible());
            assert!(!item.element().is_hidden());
        }
        assert!(items[2].is_disabled());
    }

    #[test]
    fn test_reapply_covers_new_items() {
        let mut list = items(&["Cherry"]);
        let mut filter = FilterEngine::new();
        filter.apply(&list, "ch");

        list.push(Item::new(Element::new("div").with_text("Apple")));
        let outcome = filter.reapply(&list);
        assert_eq!(outcome, FilterOutcome { visible: 1, total: 2 });
        assert!(!list[1].is_visible());
    }
}
