//! Attribute translation for host elements.
//!
//! Props on an element are turned into an attribute string one entry at a
//! time. Event handlers and structural keys never reach the markup.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::value::{Props, Value};

/// Keys that describe tree structure rather than attributes.
const STRUCTURAL_KEYS: [&str; 3] = ["children", "key", "ref"];

/// Prop that injects raw HTML in place of children.
pub const INNER_HTML_KEY: &str = "dangerouslySetInnerHTML";

/// Field of [`INNER_HTML_KEY`] holding the HTML.
pub const INNER_HTML_FIELD: &str = "__html";

/// Render all attributes of an element, each prefixed with a space.
pub fn render_attributes(attributes: &Props) -> String {
    attributes
        .iter()
        .filter(|(key, _)| !STRUCTURAL_KEYS.contains(key))
        .filter_map(|(key, value)| render_attribute(key, value))
        .collect()
}

/// Render a single attribute, or `None` when it is omitted from markup.
pub fn render_attribute(key: &str, value: &Value) -> Option<String> {
    if key == "style" {
        if let Value::Object(style) = value {
            return Some(format!(" style=\"{}\"", escape_quotes(&style_string(style))));
        }
    }

    if key.starts_with("on") && value.is_callable() {
        return None;
    }

    if key == "className" {
        let class = value.to_text().unwrap_or_default();
        return Some(format!(" class=\"{}\"", escape_quotes(&class)));
    }

    if key == INNER_HTML_KEY {
        if let Value::Object(inner) = value {
            if inner.contains_key(INNER_HTML_FIELD) {
                return None;
            }
        }
    }

    match value {
        Value::Bool(true) => Some(format!(" {}", key)),
        Value::Bool(false) => None,
        Value::Object(_) | Value::Array(_) => {
            let json = value.to_json()?;
            Some(format!(" {}=\"{}\"", key, escape_quotes(&json.to_string())))
        }
        Value::String(s) => Some(format!(" {}=\"{}\"", key, escape_quotes(s))),
        Value::Number(_) => Some(format!(" {}=\"{}\"", key, value.to_text()?)),
        Value::Null | Value::Callback(_) | Value::Node(_) => None,
    }
}

/// Flatten a style object into `key:value;...`, hyphenating mixed-case keys.
pub fn style_string(style: &Props) -> String {
    style
        .iter()
        .filter_map(|(key, value)| Some(format!("{}:{}", hyphenate(key), value.to_text()?)))
        .collect::<Vec<_>>()
        .join(";")
}

/// Convert a mixed-case key such as `backgroundColor` to `background-color`.
pub fn hyphenate(key: &str) -> Cow<'_, str> {
    static UPPER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"([A-Z])").expect("Invalid uppercase regex"));

    if !UPPER.is_match(key) {
        return Cow::Borrowed(key);
    }
    Cow::Owned(UPPER.replace_all(key, "-$1").to_lowercase())
}

/// Raw HTML that replaces an element's children, if the element asks for it.
///
/// Only an object carrying [`INNER_HTML_FIELD`] takes over the children. A
/// non-string field yields an empty body.
pub fn inner_html(attributes: &Props) -> Option<String> {
    match attributes.get(INNER_HTML_KEY)? {
        Value::Object(inner) => match inner.get(INNER_HTML_FIELD)? {
            Value::String(html) => Some(html.clone()),
            _ => Some(String::new()),
        },
        _ => None,
    }
}

fn escape_quotes(s: &str) -> Cow<'_, str> {
    if s.contains('"') {
        Cow::Owned(s.replace('"', "&quot;"))
    } else {
        Cow::Borrowed(s)
    }
}
