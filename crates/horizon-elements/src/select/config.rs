//! Attribute-driven select configuration.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use horizon_elements_core::{AttributeSchema, Element, decode};

/// Host attribute names.
pub mod attrs {
    pub const MULTIPLE: &str = "multiple";
    pub const REQUIRED: &str = "required";
    pub const DISABLED: &str = "disabled";
    pub const CLOSE_ON_SELECT: &str = "close-on-select";
    pub const SCROLL_LOCK: &str = "scroll-lock";
    pub const ICON_ROTATION: &str = "icon-rotation";
    /// Milliseconds to wait for a claimed animation; `0` waits forever.
    pub const ANIMATION_TIMEOUT: &str = "animation-timeout";
    pub const PLACEHOLDER: &str = "placeholder";
}

/// Upper bound for `animation-timeout`, one hour.
const MAX_ANIMATION_TIMEOUT_MS: f64 = 3_600_000.0;

/// The attribute schema of a select host.
pub fn schema() -> &'static AttributeSchema {
    static SCHEMA: OnceLock<AttributeSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        AttributeSchema::new()
            .boolean(attrs::MULTIPLE, false)
            .boolean(attrs::REQUIRED, false)
            .boolean(attrs::DISABLED, false)
            .boolean(attrs::CLOSE_ON_SELECT, true)
            .boolean(attrs::SCROLL_LOCK, true)
            .number(attrs::ICON_ROTATION, 180.0, -360.0, 360.0)
            .number(attrs::ANIMATION_TIMEOUT, 0.0, 0.0, MAX_ANIMATION_TIMEOUT_MS)
            .text(attrs::PLACEHOLDER, "")
    })
}

/// Configuration decoded from the host's attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectConfig {
    pub multiple: bool,
    pub required: bool,
    pub disabled: bool,
    pub close_on_select: bool,
    pub scroll_lock: bool,
    /// Degrees the icon turns while open.
    pub icon_rotation: f64,
    /// How long a claimed animation may take; `None` waits forever.
    pub animation_timeout: Option<Duration>,
    pub placeholder: String,
}

impl SelectConfig {
    /// Decode a configuration from raw attributes.
    pub fn from_attributes(raw: &BTreeMap<String, String>) -> Self {
        let decoded = decode(raw, schema());
        let timeout_ms = decoded.number(attrs::ANIMATION_TIMEOUT);
        Self {
            multiple: decoded.bool(attrs::MULTIPLE),
            required: decoded.bool(attrs::REQUIRED),
            disabled: decoded.bool(attrs::DISABLED),
            close_on_select: decoded.bool(attrs::CLOSE_ON_SELECT),
            scroll_lock: decoded.bool(attrs::SCROLL_LOCK),
            icon_rotation: decoded.number(attrs::ICON_ROTATION),
            animation_timeout: (timeout_ms > 0.0).then(|| Duration::from_secs_f64(timeout_ms / 1000.0)),
            placeholder: decoded.text(attrs::PLACEHOLDER).to_string(),
        }
    }

    /// Decode a configuration from `host`'s current attributes.
    pub fn from_element(host: &Element) -> Self {
        Self::from_attributes(&host.attributes())
    }
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self::from_attributes(&BTreeMap::new())
    }
}
