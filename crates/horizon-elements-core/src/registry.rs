//! Custom element registry.
//!
//! An [`ElementRegistry`] maps tag names to factories. Upgrading an element
//! whose tag is defined runs the factory, stores the instance in the
//! registry's lookup table and calls [`CustomElement::connected`].
//!
//! Instances never own their element's ancestors. Code that needs the widget
//! owning some element finds it by relation with
//! [`ElementRegistry::closest_instance`].
//!
//! ```
//! use std::sync::Arc;
//! use horizon_elements_core::{CustomElement, Element, ElementRegistry};
//!
//! struct Counter;
//! impl CustomElement for Counter {}
//!
//! let registry = ElementRegistry::new();
//! registry
//!     .define("x-counter", |_host| Ok(Arc::new(Counter) as Arc<dyn CustomElement>))
//!     .unwrap();
//!
//! let host = Element::new("x-counter");
//! let child = Element::new("span");
//! host.append_child(&child);
//! registry.upgrade(&host).unwrap();
//!
//! assert!(registry.closest_instance::<Counter>(&child).is_some());
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::element::{Element, ElementId};
use crate::error::{ElementError, Result};
use crate::logging::targets;
use crate::safe_call::safe_call;

/// Conversion of a shared instance into `Arc<dyn Any>` for downcasting.
///
/// Implemented for every sized `Send + Sync` type.
pub trait AsAnyArc {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAnyArc for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Behavior attached to an element by the registry.
pub trait CustomElement: AsAnyArc + Send + Sync {
    /// Called once after the instance has been stored.
    fn connected(&self) {}

    /// Called when the registry drops the instance.
    fn disconnected(&self) {}
}

/// Creates the instance for an upgraded element.
pub type ElementFactory = Arc<dyn Fn(&Element) -> Result<Arc<dyn CustomElement>> + Send + Sync>;

/// Tag-name keyed registry of custom element definitions and live instances.
#[derive(Default)]
pub struct ElementRegistry {
    definitions: RwLock<HashMap<String, ElementFactory>>,
    instances: RwLock<HashMap<ElementId, Arc<dyn CustomElement>>>,
}

/// Whether `tag` is a valid custom element name: lowercase ASCII, starting
/// with a letter and containing a hyphen.
pub fn is_valid_custom_element_name(tag: &str) -> bool {
    tag.starts_with(|c: char| c.is_ascii_lowercase())
        && tag.contains('-')
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `tag`.
    ///
    /// Fails if the name is invalid or already defined.
    pub fn define<F>(&self, tag: &str, factory: F) -> Result<()>
    where
        F: Fn(&Element) -> Result<Arc<dyn CustomElement>> + Send + Sync + 'static,
    {
        if !is_valid_custom_element_name(tag) {
            return Err(ElementError::InvalidTagName(tag.to_string()).into());
        }

        let mut definitions = self.definitions.write();
        if definitions.contains_key(tag) {
            return Err(ElementError::AlreadyDefined(tag.to_string()).into());
        }
        definitions.insert(tag.to_string(), Arc::new(factory));
        tracing::debug!(target: targets::REGISTRY, tag, "custom element defined");
        Ok(())
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.read().contains_key(tag)
    }

    /// Create the instance for `element`, or return the existing one.
    pub fn upgrade(&self, element: &Element) -> Result<Arc<dyn CustomElement>> {
        if let Some(instance) = self.instance(element) {
            return Ok(instance);
        }

        let factory = self
            .definitions
            .read()
            .get(element.tag())
            .cloned()
            .ok_or_else(|| ElementError::Undefined(element.tag().to_string()))?;

        let instance = factory(element)?;
        self.instances
            .write()
            .insert(element.id(), instance.clone());
        tracing::debug!(
            target: targets::REGISTRY,
            tag = element.tag(),
            id = element.id().as_u64(),
            "element upgraded"
        );

        safe_call("connected callback", || {
            instance.connected();
            Ok(())
        });
        Ok(instance)
    }

    /// Upgrade `root` and every descendant with a defined tag.
    ///
    /// Failures are logged and skipped. Returns the number of new instances.
    pub fn upgrade_tree(&self, root: &Element) -> usize {
        let mut candidates = vec![root.clone()];
        candidates.extend(root.descendants());

        candidates
            .iter()
            .filter(|element| self.is_defined(element.tag()) && self.instance(element).is_none())
            .filter(|element| {
                safe_call("upgrade", || self.upgrade(element).map(|_| ())).is_some()
            })
            .count()
    }

    /// The instance attached to `element`, if any.
    pub fn instance(&self, element: &Element) -> Option<Arc<dyn CustomElement>> {
        self.instances.read().get(&element.id()).cloned()
    }

    /// The instance attached to `element`, if it has type `T`.
    pub fn instance_of<T: CustomElement + 'static>(&self, element: &Element) -> Option<Arc<T>> {
        self.instance(element)?.into_any_arc().downcast::<T>().ok()
    }

    /// The instance of type `T` attached to `element` or its nearest ancestor
    /// that has one.
    pub fn closest_instance<T: CustomElement + 'static>(&self, element: &Element) -> Option<Arc<T>> {
        std::iter::once(element.clone())
            .chain(element.ancestors())
            .find_map(|candidate| self.instance_of::<T>(&candidate))
    }

    /// Drop the instance attached to `element` and call
    /// [`CustomElement::disconnected`]. Returns `false` if there was none.
    pub fn disconnect(&self, element: &Element) -> bool {
        let instance = self.instances.write().remove(&element.id());
        match instance {
            Some(instance) => {
                safe_call("disconnected callback", || {
                    instance.disconnected();
                    Ok(())
                });
                tracing::debug!(target: targets::REGISTRY, tag = element.tag(), "element disconnected");
                true
            }
            None => false,
        }
    }

    /// Disconnect every instance in `root`'s subtree, including `root`.
    pub fn disconnect_tree(&self, root: &Element) -> usize {
        std::iter::once(root.clone())
            .chain(root.descendants())
            .filter(|element| self.disconnect(element))
            .count()
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.instances.read().len()
    }
}

impl std::fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<String> = self.definitions.read().keys().cloned().collect();
        tags.sort();
        f.debug_struct("ElementRegistry")
            .field("definitions", &tags)
            .field("instances", &self.instance_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(ElementRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        connected: AtomicUsize,
        disconnected: Arc<AtomicUsize>,
    }

    impl CustomElement for Probe {
        fn connected(&self) {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }

        fn disconnected(&self) {
            self.disconnected.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Other;
    impl CustomElement for Other {}

    fn registry_with_probe(disconnected: Arc<AtomicUsize>) -> ElementRegistry {
        let registry = ElementRegistry::new();
        registry
            .define("x-probe", move |_| {
                Ok(Arc::new(Probe {
                    connected: AtomicUsize::new(0),
                    disconnected: disconnected.clone(),
                }) as Arc<dyn CustomElement>)
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_define_validation() {
        let registry = registry_with_probe(Arc::default());
        let factory = |_: &Element| -> Result<Arc<dyn CustomElement>> { Ok(Arc::new(Other)) };

        assert_eq!(
            registry.define("x-probe", factory),
            Err(Error::Element(ElementError::AlreadyDefined("x-probe".into())))
        );
        assert_eq!(
            registry.define("probe", factory),
            Err(Error::Element(ElementError::InvalidTagName("probe".into())))
        );
        assert!(registry.define("X-Probe", factory).is_err());
        assert!(registry.define("1-probe", factory).is_err());
        assert!(registry.define("x-other", factory).is_ok());
    }

    #[test]
    fn test_upgrade_is_idempotent() {
        let registry = registry_with_probe(Arc::default());
        let host = Element::new("x-probe");

        registry.upgrade(&host).unwrap();
        registry.upgrade(&host).unwrap();

        let probe = registry.instance_of::<Probe>(&host).unwrap();
        assert_eq!(probe.connected.load(Ordering::SeqCst), 1);
        assert!(registry.instance_of::<Other>(&host).is_none());
    }

    #[test]
    fn test_upgrade_undefined() {
        let registry = ElementRegistry::new();
        let result = registry.upgrade(&Element::new("x-missing"));
        assert_eq!(
            result.err(),
            Some(Error::Element(ElementError::Undefined("x-missing".into())))
        );
    }

    #[test]
    fn test_upgrade_tree_and_closest_instance() {
        let disconnected = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_probe(disconnected.clone());

        let root = Element::new("div");
        let outer = Element::new("x-probe");
        let inner = Element::new("x-probe");
        let leaf = Element::new("span");
        root.append_child(&outer);
        outer.append_child(&inner);
        inner.append_child(&leaf);

        assert_eq!(registry.upgrade_tree(&root), 2);
        assert_eq!(registry.upgrade_tree(&root), 0);

        let nearest = registry.closest_instance::<Probe>(&leaf).unwrap();
        let inner_instance = registry.instance_of::<Probe>(&inner).unwrap();
        assert!(Arc::ptr_eq(&nearest, &inner_instance));
        assert!(registry.closest_instance::<Probe>(&root).is_none());

        assert_eq!(registry.disconnect_tree(&root), 2);
        assert_eq!(disconnected.load(Ordering::SeqCst), 2);
        assert_eq!(registry.instance_count(), 0);
    }
}
