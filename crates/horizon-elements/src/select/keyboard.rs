//! Key routing for the select host.

use horizon_elements_core::{Key, KeyboardEvent};

/// What a key press asks the select to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Open,
    Close,
    /// Close without consuming the key, so focus can move on.
    CloseAndContinue,
    SelectFocused,
    Next,
    Previous,
    First,
    Last,
    TypeAhead(char),
    Ignore,
}

impl KeyAction {
    /// Whether the key press should have its default prevented.
    pub fn consumes_key(self) -> bool {
        !matches!(self, Self::Ignore | Self::CloseAndContinue | Self::TypeAhead(_))
    }
}

/// Map a key press to an action given the select's state.
///
/// While the search field has focus it keeps every key it can edit with:
/// only Escape, the vertical arrows and Enter are routed.
pub fn route(keyboard: &KeyboardEvent, open: bool, search_focused: bool) -> KeyAction {
    match &keyboard.key {
        Key::Enter => activate(open),
        Key::Space if !search_focused => activate(open),
        Key::ArrowDown if open => KeyAction::Next,
        Key::ArrowUp if open => KeyAction::Previous,
        Key::ArrowDown | Key::ArrowUp => KeyAction::Open,
        Key::Home if open && !search_focused => KeyAction::First,
        Key::End if open && !search_focused => KeyAction::Last,
        Key::Escape if open => KeyAction::Close,
        Key::Tab if open => KeyAction::CloseAndContinue,
        key if !search_focused && !keyboard.modifiers.has_command() => key
            .printable_char()
            .map_or(KeyAction::Ignore, KeyAction::TypeAhead),
        _ => KeyAction::Ignore,
    }
}

fn activate(open: bool) -> KeyAction {
    if open {
        KeyAction::SelectFocused
    } else {
        KeyAction::Open
    }
}
