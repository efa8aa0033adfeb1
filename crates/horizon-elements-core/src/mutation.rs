//! Mutation observation.
//!
//! Elements attached to a document report attribute and child-list changes to
//! it. Matching observers collect the records, and the document delivers each
//! observer's whole batch in one callback at the next microtask checkpoint.

use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use crate::element::Element;

new_key_type! {
    /// Identifies a mutation observer registration.
    pub struct ObserverId;
}

/// Which mutations an observer is interested in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Report children being added or removed.
    pub child_list: bool,
    /// Report attribute changes.
    pub attributes: bool,
    /// Also report mutations of the target's descendants.
    pub subtree: bool,
    /// Restrict attribute reports to these names.
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    /// Observe child-list changes anywhere in the subtree.
    pub fn structure() -> Self {
        Self {
            child_list: true,
            subtree: true,
            ..Self::default()
        }
    }

    /// Observe changes of the named attributes on the target itself.
    pub fn attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: true,
            attribute_filter: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    fn wants(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList { .. } => self.child_list,
            MutationKind::Attributes { name, .. } => {
                self.attributes
                    && self
                        .attribute_filter
                        .as_ref()
                        .is_none_or(|filter| filter.iter().any(|f| f == name))
            }
        }
    }
}

/// What changed.
#[derive(Debug, Clone)]
pub enum MutationKind {
    ChildList {
        added: Vec<Element>,
        removed: Vec<Element>,
    },
    Attributes {
        name: String,
        old_value: Option<String>,
    },
}

/// A single mutation of one element.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    /// The element whose attributes or children changed.
    pub target: Element,
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn is_child_list(&self) -> bool {
        matches!(self.kind, MutationKind::ChildList { .. })
    }

    /// The attribute name, for attribute records.
    pub fn attribute_name(&self) -> Option<&str> {
        match &self.kind {
            MutationKind::Attributes { name, .. } => Some(name),
            MutationKind::ChildList { .. } => None,
        }
    }
}

/// Callback receiving one observer's batch of records.
pub type MutationCallback = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

struct Registration {
    target: Element,
    options: ObserveOptions,
    callback: MutationCallback,
    pending: Vec<MutationRecord>,
}

/// The observers registered with one document.
#[derive(Default)]
pub(crate) struct ObserverList {
    registrations: SlotMap<ObserverId, Registration>,
}

impl ObserverList {
    pub(crate) fn observe(
        &mut self,
        target: Element,
        options: ObserveOptions,
        callback: MutationCallback,
    ) -> ObserverId {
        self.registrations.insert(Registration {
            target,
            options,
            callback,
            pending: Vec::new(),
        })
    }

    pub(crate) fn disconnect(&mut self, id: ObserverId) -> bool {
        self.registrations.remove(id).is_some()
    }

    /// Queue `record` for every observer it matches.
    pub(crate) fn record(&mut self, record: &MutationRecord) {
        for registration in self.registrations.values_mut() {
            if !registration.options.wants(&record.kind) {
                continue;
            }
            let matches = if registration.options.subtree {
                registration.target.contains(&record.target)
            } else {
                registration.target == record.target
            };
            if matches {
                registration.pending.push(record.clone());
            }
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.registrations.values().any(|r| !r.pending.is_empty())
    }

    /// Take every non-empty batch along with its callback.
    pub(crate) fn take_deliveries(&mut self) -> Vec<(MutationCallback, Vec<MutationRecord>)> {
        self.registrations
            .values_mut()
            .filter(|r| !r.pending.is_empty())
            .map(|r| (r.callback.clone(), std::mem::take(&mut r.pending)))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute_record(target: &Element, name: &str) -> MutationRecord {
        MutationRecord {
            target: target.clone(),
            kind: MutationKind::Attributes {
                name: name.to_string(),
                old_value: None,
            },
        }
    }

    #[test]
    fn test_attribute_filter() {
        let host = Element::new("x-host");
        let mut observers = ObserverList::default();
        observers.observe(
            host.clone(),
            ObserveOptions::attributes(["multiple"]),
            Arc::new(|_| {}),
        );

        observers.record(&attribute_record(&host, "data-state"));
        assert!(!observers.has_pending());

        observers.record(&attribute_record(&host, "multiple"));
        let deliveries = observers.take_deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].1.len(), 1);
        assert!(!observers.has_pending());
    }

    #[test]
    fn test_subtree_matching() {
        let host = Element::new("x-host");
        let child = Element::new("div");
        host.append_child(&child);
        let stranger = Element::new("div");

        let mut observers = ObserverList::default();
        observers.observe(host.clone(), ObserveOptions::structure(), Arc::new(|_| {}));

        let record = |target: &Element| MutationRecord {
            target: target.clone(),
            kind: MutationKind::ChildList {
                added: Vec::new(),
                removed: Vec::new(),
            },
        };
        observers.record(&record(&child));
        observers.record(&record(&stranger));
        observers.record(&attribute_record(&child, "value"));

        let deliveries = observers.take_deliveries();
        assert_eq!(deliveries[0].1.len(), 1);
        assert!(deliveries[0].1[0].is_child_list());
    }
}
