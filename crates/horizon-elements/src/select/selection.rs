//! The set of selected values.

/// Selected value identifiers, reported in insertion order.
///
/// In single mode the set never holds more than one value: selecting or
/// adding a value replaces whatever was selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    values: Vec<String>,
    multiple: bool,
}

impl SelectionSet {
    pub fn new(multiple: bool) -> Self {
        Self {
            values: Vec::new(),
            multiple,
        }
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Switch between single and multiple mode.
    ///
    /// Switching to single mode keeps only the first selected value.
    pub fn set_multiple(&mut self, multiple: bool) {
        self.multiple = multiple;
        if !multiple {
            self.values.truncate(1);
        }
    }

    /// Add `value`. In single mode this replaces the current selection.
    pub fn add(&mut self, value: &str) {
        if !self.multiple {
            self.values.clear();
        }
        if !self.has(value) {
            self.values.push(value.to_string());
        }
    }

    /// Remove `value`. Returns `false` if it was not selected.
    pub fn delete(&mut self, value: &str) -> bool {
        let before = self.values.len();
        self.values.retain(|v| v != value);
        self.values.len() != before
    }

    pub fn has(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Apply a user selection of `value`.
    ///
    /// Multiple mode toggles the value; single mode replaces the selection.
    /// Returns whether `value` is selected afterwards.
    pub fn select(&mut self, value: &str) -> bool {
        if self.multiple && self.has(value) {
            self.delete(value);
            false
        } else {
            self.add(value);
            true
        }
    }

    /// Replace the selection with `values`, dropping duplicates.
    ///
    /// Single mode keeps the first value only.
    pub fn replace_all<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.values.clear();
        for value in values {
            let value = value.as_ref();
            if !self.has(value) {
                self.values.push(value.to_string());
            }
            if !self.multiple && !self.values.is_empty() {
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
