//! Jump-to-item typing.
//!
//! Typing a character focuses the first item whose text starts with it.
//! Typing the same character again cycles through the matching items,
//! wrapping at the end of the list. The buffer is cleared after
//! [`TYPE_AHEAD_RESET`] without a keystroke.

use std::time::Duration;

use super::items::Item;

/// Idle time after which the type-ahead buffer is cleared.
pub const TYPE_AHEAD_RESET: Duration = Duration::from_millis(1000);

/// Type-ahead match state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeAheadMatcher {
    buffer: String,
}

impl TypeAheadMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current (lowercased) buffer.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Feed one keystroke and return the index to focus.
    ///
    /// A repeat of a single-character buffer searches onward from the item
    /// after `focused`, wrapping around; any other character restarts the
    /// buffer and searches from the top. Only navigable items match.
    pub fn find(&mut self, ch: char, items: &[Item], focused: Option<usize>) -> Option<usize> {
        let key: String = ch.to_lowercase().collect();
        let repeated = self.buffer.chars().count() == 1 && self.buffer == key;

        let start = if repeated {
            focused.map_or(0, |i| i + 1)
        } else {
            self.buffer = key.clone();
            0
        };

        let len = items.len();
        (0..len)
            .map(|offset| (start + offset) % len)
            .find(|&index| {
                let item = &items[index];
                item.is_navigable() && item.text().to_lowercase().starts_with(&key)
            })
    }
}
