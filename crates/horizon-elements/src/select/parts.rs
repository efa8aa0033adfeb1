//! The marked descendants a select host is assembled from.

use horizon_elements_core::{Element, ElementError};

use crate::logging::targets;

/// Marks the button that toggles the select.
pub const TRIGGER: &str = "data-select-trigger";
/// Marks the popup holding the items.
pub const CONTENT: &str = "data-select-content";
/// Marks one selectable item.
pub const ITEM: &str = "data-select-item";
/// Marks the element showing the selected value.
pub const VALUE: &str = "data-select-value";
/// Marks the search field.
pub const SEARCH: &str = "data-select-search";
/// Marks the rotating indicator icon.
pub const ICON: &str = "data-select-icon";
/// Marks the element shown when the filter leaves no item visible.
pub const EMPTY: &str = "data-select-empty";

/// The parts found under a host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parts {
    pub trigger: Option<Element>,
    pub content: Option<Element>,
    pub value: Option<Element>,
    pub search: Option<Element>,
    pub icon: Option<Element>,
    pub empty: Option<Element>,
}

impl Parts {
    /// Find the first descendant of `host` carrying each part attribute.
    pub fn discover(host: &Element) -> Self {
        let mut parts = Self::default();
        for element in host.descendants() {
            let slot = if element.has_attribute(TRIGGER) {
                &mut parts.trigger
            } else if element.has_attribute(CONTENT) {
                &mut parts.content
            } else if element.has_attribute(VALUE) {
                &mut parts.value
            } else if element.has_attribute(SEARCH) {
                &mut parts.search
            } else if element.has_attribute(ICON) {
                &mut parts.icon
            } else if element.has_attribute(EMPTY) {
                &mut parts.empty
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(element);
            }
        }
        parts
    }

    /// The content part, or a missing part error.
    pub fn require_content(&self, host: &Element) -> Result<&Element, ElementError> {
        self.content
            .as_ref()
            .ok_or_else(|| ElementError::missing_part(host.tag(), "content"))
    }

    /// Log a warning for each required part that is missing.
    pub fn warn_missing(&self, host: &Element) {
        if self.trigger.is_none() {
            let error = ElementError::missing_part(host.tag(), "trigger");
            tracing::warn!(target: targets::SELECT, %error, "trigger interactions are disabled");
        }
        if let Err(error) = self.require_content(host) {
            tracing::warn!(target: targets::SELECT, %error, "open and close are disabled");
        }
    }

    /// Whether the search part currently holds keyboard focus.
    pub fn search_focused(&self) -> bool {
        self.search.as_ref().is_some_and(Element::is_focused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_parts() {
        let host = Element::new("horizon-select")
            .with_child(
                Element::new("button")
                    .with_attribute(TRIGGER, "")
                    .with_child(Element::new("span").with_attribute(VALUE, ""))
                    .with_child(Element::new("span").with_attribute(ICON, "")),
            )
            .with_child(
                Element::new("div")
                    .with_attribute(CONTENT, "")
                    .with_child(Element::new("input").with_attribute(SEARCH, ""))
                    .with_child(Element::new("div").with_attribute(ITEM, "")),
            );

        let parts = Parts::discover(&host);
        assert_eq!(parts.trigger.as_ref().map(Element::tag), Some("button"));
        assert!(parts.content.is_some());
        assert!(parts.value.is_some());
        assert!(parts.search.is_some());
        assert!(parts.icon.is_some());
        assert!(parts.empty.is_none());
        assert!(parts.require_content(&host).is_ok());
    }

    #[test]
    fn test_missing_content() {
        let host = Element::new("horizon-select");
        let parts = Parts::discover(&host);
        assert_eq!(
            parts.require_content(&host),
            Err(ElementError::missing_part("horizon-select", "content"))
        );
    }
}
