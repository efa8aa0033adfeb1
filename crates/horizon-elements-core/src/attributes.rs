//! Attribute decoding.
//!
//! Widgets declare their configurable attributes once as an
//! [`AttributeSchema`] and derive a fresh configuration from the raw string
//! attributes with [`decode`] whenever they change. Decoding is pure and
//! total: missing or malformed values fall back to the schema default.
//!
//! # Value rules
//!
//! | Kind | Accepted | Fallback |
//! |------|----------|----------|
//! | boolean | `""`, `"true"`, the attribute's own name → `true`; `"false"` → `false` | default |
//! | number | any finite float, clamped to the declared bounds | default |
//! | text | any string | default when absent |
//! | choice | one of the declared options, case-insensitively | default |
//!
//! ```
//! use std::collections::BTreeMap;
//! use horizon_elements_core::attributes::{AttributeSchema, decode};
//!
//! let schema = AttributeSchema::new()
//!     .boolean("multiple", false)
//!     .number("icon-rotation", 180.0, -360.0, 360.0);
//!
//! let mut raw = BTreeMap::new();
//! raw.insert("multiple".to_string(), String::new());
//! raw.insert("icon-rotation".to_string(), "720".to_string());
//!
//! let config = decode(&raw, &schema);
//! assert!(config.bool("multiple"));
//! assert_eq!(config.number("icon-rotation"), 360.0);
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::logging::targets;

/// The type and bounds of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    Boolean,
    Number { min: f64, max: f64 },
    Text,
    Choice(Vec<&'static str>),
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
struct AttributeSpec {
    name: &'static str,
    kind: AttributeKind,
    default: AttributeValue,
}

/// The attributes a widget reads, with their kinds and defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSchema {
    specs: Vec<AttributeSpec>,
}

impl AttributeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a boolean attribute.
    pub fn boolean(mut self, name: &'static str, default: bool) -> Self {
        self.specs.push(AttributeSpec {
            name,
            kind: AttributeKind::Boolean,
            default: AttributeValue::Boolean(default),
        });
        self
    }

    /// Declare a number attribute clamped to `min..=max`.
    pub fn number(mut self, name: &'static str, default: f64, min: f64, max: f64) -> Self {
        self.specs.push(AttributeSpec {
            name,
            kind: AttributeKind::Number { min, max },
            default: AttributeValue::Number(default),
        });
        self
    }

    /// Declare a free-form text attribute.
    pub fn text(mut self, name: &'static str, default: &str) -> Self {
        self.specs.push(AttributeSpec {
            name,
            kind: AttributeKind::Text,
            default: AttributeValue::Text(default.to_string()),
        });
        self
    }

    /// Declare a text attribute restricted to `options`.
    pub fn choice(
        mut self,
        name: &'static str,
        default: &'static str,
        options: &[&'static str],
    ) -> Self {
        self.specs.push(AttributeSpec {
            name,
            kind: AttributeKind::Choice(options.to_vec()),
            default: AttributeValue::Text(default.to_string()),
        });
        self
    }

    /// Names of every declared attribute, for observer filters.
    pub fn names(&self) -> Vec<&'static str> {
        self.specs.iter().map(|spec| spec.name).collect()
    }
}

/// The result of [`decode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedAttributes {
    values: HashMap<&'static str, AttributeValue>,
}

impl DecodedAttributes {
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    /// A boolean value; `false` if `name` is not a declared boolean.
    pub fn bool(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(AttributeValue::Boolean(true)))
    }

    /// A number value; `0.0` if `name` is not a declared number.
    pub fn number(&self, name: &str) -> f64 {
        match self.values.get(name) {
            Some(AttributeValue::Number(n)) => *n,
            _ => 0.0,
        }
    }

    /// A text or choice value; empty if `name` is not declared as either.
    pub fn text(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(AttributeValue::Text(text)) => text,
            _ => "",
        }
    }
}

/// Decode raw string attributes against `schema`.
pub fn decode(raw: &BTreeMap<String, String>, schema: &AttributeSchema) -> DecodedAttributes {
    let values = schema
        .specs
        .iter()
        .map(|spec| {
            let value = match raw.get(spec.name) {
                Some(raw_value) => decode_one(spec, raw_value).unwrap_or_else(|| {
                    tracing::debug!(
                        target: targets::ATTRIBUTES,
                        attribute = spec.name,
                        value = %raw_value,
                        "malformed attribute value, using default"
                    );
                    spec.default.clone()
                }),
                None => spec.default.clone(),
            };
            (spec.name, value)
        })
        .collect();
    DecodedAttributes { values }
}

fn decode_one(spec: &AttributeSpec, raw: &str) -> Option<AttributeValue> {
    match &spec.kind {
        AttributeKind::Boolean => {
            let trimmed = raw.trim();
            if trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case("true")
                || trimmed.eq_ignore_ascii_case(spec.name)
            {
                Some(AttributeValue::Boolean(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Some(AttributeValue::Boolean(false))
            } else {
                None
            }
        }
        AttributeKind::Number { min, max } => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|n| AttributeValue::Number(n.clamp(*min, *max))),
        AttributeKind::Text => Some(AttributeValue::Text(raw.to_string())),
        AttributeKind::Choice(options) => options
            .iter()
            .find(|option| option.eq_ignore_ascii_case(raw.trim()))
            .map(|option| AttributeValue::Text((*option).to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn schema() -> AttributeSchema {
        AttributeSchema::new()
            .boolean("multiple", false)
            .boolean("close-on-select", true)
            .number("icon-rotation", 180.0, -360.0, 360.0)
            .text("placeholder", "")
            .choice("side", "bottom", &["top", "bottom"])
    }

    #[test]
    fn test_defaults_when_absent() {
        let config = decode(&raw(&[]), &schema());
        assert!(!config.bool("multiple"));
        assert!(config.bool("close-on-select"));
        assert_eq!(config.number("icon-rotation"), 180.0);
        assert_eq!(config.text("placeholder"), "");
        assert_eq!(config.text("side"), "bottom");
    }

    #[test]
    fn test_boolean_forms() {
        let schema = schema();
        assert!(decode(&raw(&[("multiple", "")]), &schema).bool("multiple"));
        assert!(decode(&raw(&[("multiple", "multiple")]), &schema).bool("multiple"));
        assert!(decode(&raw(&[("multiple", "TRUE")]), &schema).bool("multiple"));
        assert!(!decode(&raw(&[("close-on-select", "false")]), &schema).bool("close-on-select"));
        // Malformed falls back to the default, not to presence.
        assert!(decode(&raw(&[("close-on-select", "nope")]), &schema).bool("close-on-select"));
        assert!(!decode(&raw(&[("multiple", "nope")]), &schema).bool("multiple"));
    }

    #[test]
    fn test_number_clamped_and_validated() {
        let schema = schema();
        let number = |value: &str| decode(&raw(&[("icon-rotation", value)]), &schema).number("icon-rotation");
        assert_eq!(number("90"), 90.0);
        assert_eq!(number(" -45.5 "), -45.5);
        assert_eq!(number("-1000"), -360.0);
        assert_eq!(number("abc"), 180.0);
        assert_eq!(number("NaN"), 180.0);
        assert_eq!(number("inf"), 180.0);
    }

    #[test]
    fn test_choice_and_text() {
        let config = decode(
            &raw(&[("side", "TOP"), ("placeholder", "Pick a fruit")]),
            &schema(),
        );
        assert_eq!(config.text("side"), "top");
        assert_eq!(config.text("placeholder"), "Pick a fruit");

        let config = decode(&raw(&[("side", "left")]), &schema());
        assert_eq!(config.text("side"), "bottom");
    }

    #[test]
    fn test_undeclared_names() {
        let config = decode(&raw(&[("multiple", "")]), &AttributeSchema::new());
        assert!(config.get("multiple").is_none());
        assert!(!config.bool("multiple"));
        assert_eq!(config.number("multiple"), 0.0);
    }
}
