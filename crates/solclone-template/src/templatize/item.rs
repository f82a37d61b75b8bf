//! Item-level identifiers.

use serde_json::Value;

use crate::placeholder::{contains_placeholder, item_id, item_url};

/// Rewrites the item's own id, url, keyword/tag entries equal to the raw
/// id, and the service's self reference.
pub(super) fn templatize_item(document: &mut Value, key: &str) {
    if let Some(item) = document.get_mut("item") {
        if let Some(Value::String(id)) = item.get_mut("id") {
            if id == key {
                *id = item_id(key);
            }
        }
        if let Some(Value::String(url)) = item.get_mut("url") {
            if !url.is_empty() && !contains_placeholder(url) {
                *url = item_url(key);
            }
        }
        for list in ["typeKeywords", "tags"] {
            if let Some(Value::Array(entries)) = item.get_mut(list) {
                for entry in entries.iter_mut().filter(|e| e.as_str() == Some(key)) {
                    *entry = Value::String(item_id(key));
                }
            }
        }
    }
    if let Some(Value::String(service_item_id)) = document.pointer_mut("/properties/service/serviceItemId") {
        if service_item_id == key {
            *service_item_id = item_id(key);
        }
    }
}
