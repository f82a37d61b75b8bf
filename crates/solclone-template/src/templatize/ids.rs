//! Final identifier pass.

use serde_json::Value;

use super::Discovered;
use crate::field_ref::replace_outside_tokens;
use crate::placeholder::item_id;

/// Replaces raw item ids left anywhere in the document by `{{id.itemId}}`.
///
/// A string matches when it equals an id or contains it as a delimited
/// token (inside a url, say). Every id other than `own_key` that is found
/// is recorded as a dependency.
pub(super) fn templatize_ids(document: &mut Value, own_key: &str, ids: &[&str], found: &mut Discovered) {
    match document {
        Value::String(text) => {
            for id in ids.iter().copied().filter(|id| !id.is_empty()) {
                let updated = replace_outside_tokens(text, id, &item_id(id), true);
                if updated != *text {
                    *text = updated;
                    if id != own_key {
                        found.insert(id);
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                templatize_ids(item, own_key, ids, found);
            }
        }
        Value::Object(map) => {
            for value in map.values_mut() {
                templatize_ids(value, own_key, ids, found);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
