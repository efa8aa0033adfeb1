//! Horizon Elements - logic-only UI widgets as custom elements.
//!
//! Widgets own behavior and accessibility state; styling is left entirely to
//! the consumer, who hooks into the `data-*` and ARIA attributes the widgets
//! maintain and into the before/after transition events.
//!
//! This crate re-exports the core host environment from
//! `horizon-elements-core`.
//!
//! # Example
//!
//! ```
//! use horizon_elements::prelude::*;
//! use horizon_elements::select::parts;
//!
//! let document = Document::new();
//! let registry = ElementRegistry::new();
//! horizon_elements::define_elements(&registry).unwrap();
//!
//! let host = Element::new(horizon_elements::SELECT_TAG)
//!     .with_child(Element::new("button").with_attribute(parts::TRIGGER, ""))
//!     .with_child(
//!         Element::new("div")
//!             .with_attribute(parts::CONTENT, "")
//!             .with_child(Element::new("div").with_attribute(parts::ITEM, "").with_text("Apple")),
//!     );
//! document.body().append_child(&host);
//! registry.upgrade_tree(&document.body());
//!
//! let select = registry.instance_of::<Select>(&host).unwrap();
//! let trigger = host.query_attribute(parts::TRIGGER).unwrap();
//! document.click(&trigger);
//! assert!(select.is_open());
//! ```

use std::sync::Arc;

pub use horizon_elements_core::*;

pub mod animation;
pub mod logging;
pub mod prelude;
pub mod select;

/// Tag name the select widget is defined under.
pub const SELECT_TAG: &str = "horizon-select";

/// Define every widget of this crate in `registry`.
pub fn define_elements(registry: &ElementRegistry) -> Result<()> {
    registry.define(SELECT_TAG, |host| {
        Ok(select::Select::new(host.clone()) as Arc<dyn CustomElement>)
    })?;
    tracing::debug!(target: logging::targets::SELECT, tag = SELECT_TAG, "elements defined");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_elements_once() {
        let registry = ElementRegistry::new();
        define_elements(&registry).unwrap();
        assert!(registry.is_defined(SELECT_TAG));
        assert!(define_elements(&registry).is_err());
    }
}
