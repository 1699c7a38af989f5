use std::collections::BTreeSet;

use crate::template::PHOTO_FIELD;

/// Collect every data-field key a scene document references: `{{key}}`
/// placeholders in text content, explicit binding keys, and the reserved
/// `photo` key when any photo slot exists (reported once no matter how many
/// slots there are).
///
/// Works on the raw JSON value so it can be pointed at externally-stored
/// documents before they are parsed into the typed model. Never mutates its
/// input; null or malformed input yields an empty set.
pub fn extract_fields(document: &serde_json::Value) -> BTreeSet<String> {
    let mut fields = BTreeSet::new();
    walk(document, &mut fields);
    fields
}

fn walk(value: &serde_json::Value, fields: &mut BTreeSet<String>) {
    let Some(obj) = value.as_object() else {
        return;
    };

    if let Some(text) = obj.get("text").and_then(serde_json::Value::as_str) {
        for key in placeholder_keys(text) {
            fields.insert(key);
        }
    }

    if let Some(data) = obj.get("data").and_then(serde_json::Value::as_object) {
        if let Some(key) = data.get("key").and_then(serde_json::Value::as_str) {
            let key = key.trim();
            if !key.is_empty() {
                fields.insert(key.to_string());
            }
        }
        if data.get("isPhotoSlot").and_then(serde_json::Value::as_bool) == Some(true) {
            fields.insert(PHOTO_FIELD.to_string());
        }
    }

    if let Some(children) = obj.get("objects").and_then(serde_json::Value::as_array) {
        for child in children {
            walk(child, fields);
        }
    }
}

/// All `{{key}}` occurrences in `text`, trimmed, in order of appearance.
/// Empty keys and unterminated `{{` are skipped.
pub fn placeholder_keys(text: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let key = after[..end].trim();
        if !key.is_empty() {
            keys.push(key.to_string());
        }
        rest = &after[end + 2..];
    }
    keys
}

/// Replace each `{{key}}` occurrence with `resolve(key)`. Unterminated
/// braces and empty keys stay literal. Returns the rewritten text and
/// whether any occurrence was replaced.
pub fn replace_placeholders(
    text: &str,
    mut resolve: impl FnMut(&str) -> String,
) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut changed = false;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = after[..end].trim();
        if key.is_empty() {
            out.push_str(&rest[start..start + 2 + end + 2]);
        } else {
            out.push_str(&resolve(key));
            changed = true;
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    (out, changed)
}
