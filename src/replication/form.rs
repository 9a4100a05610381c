//! Form Validation
//!
//! The replicator does not own the document schema. It only asks a
//! [`FormValidator`] whether a parsed body is acceptable. The default
//! [`CommonFormValidator`] checks the structural shape of a Common Form:
//!
//! - a form is an object with a non-empty `content` array
//! - `conspicuous`, when present, must be `"yes"`
//! - each content element is a non-empty string, or an object holding
//!   exactly one of `use`, `definition`, `reference` (non-empty strings),
//!   `blank` (a string), or `form` (a child form, with optional `heading`)
//! - two strings are never adjacent

use serde_json::{Map, Value};

/// Schema check for fetched documents
pub trait FormValidator: Send + Sync {
    /// Returns true if `value` is a valid document.
    fn is_valid(&self, value: &Value) -> bool;
}

impl<F> FormValidator for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn is_valid(&self, value: &Value) -> bool {
        self(value)
    }
}

/// Structural validator for Common Form documents
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonFormValidator;

impl FormValidator for CommonFormValidator {
    fn is_valid(&self, value: &Value) -> bool {
        value.as_object().map(is_form).unwrap_or(false)
    }
}

fn is_form(form: &Map<String, Value>) -> bool {
    let allowed = |key: &str| key == "content" || key == "conspicuous";
    if !form.keys().all(|k| allowed(k)) {
        return false;
    }

    if let Some(conspicuous) = form.get("conspicuous") {
        if conspicuous.as_str() != Some("yes") {
            return false;
        }
    }

    let Some(content) = form.get("content").and_then(Value::as_array) else {
        return false;
    };
    if content.is_empty() {
        return false;
    }

    let adjacent_strings = content
        .windows(2)
        .any(|pair| pair[0].is_string() && pair[1].is_string());
    if adjacent_strings {
        return false;
    }

    content.iter().all(is_content_element)
}

fn is_content_element(element: &Value) -> bool {
    match element {
        Value::String(text) => !text.is_empty(),
        Value::Object(object) => is_child(object) || is_inline(object),
        _ => false,
    }
}

fn is_inline(object: &Map<String, Value>) -> bool {
    if object.len() != 1 {
        return false;
    }
    let Some((key, value)) = object.iter().next() else {
        return false;
    };
    match key.as_str() {
        "use" | "definition" | "reference" => value.as_str().map(|s| !s.is_empty()).unwrap_or(false),
        "blank" => value.is_string(),
        _ => false,
    }
}

fn is_child(object: &Map<String, Value>) -> bool {
    let Some(form) = object.get("form").and_then(Value::as_object) else {
        return false;
    };
    let heading_ok = match object.get("heading") {
        None => true,
        Some(heading) => heading.as_str().map(|s| !s.is_empty()).unwrap_or(false),
    };
    let keys_ok = object.keys().all(|k| k == "form" || k == "heading");

    heading_ok && keys_ok && is_form(form)
}
