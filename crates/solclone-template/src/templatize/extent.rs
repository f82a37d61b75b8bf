//! Spatial extents.
//!
//! Extents are supplied at deploy time, so the concrete source values are
//! replaced by `{{solutionExtent}}` / `{{solutionItemExtent}}`.

use serde_json::Value;
use solclone_common::constants::{SOLUTION_EXTENT, SOLUTION_ITEM_EXTENT};

use crate::placeholder::token;

const SERVICE_EXTENTS: [&str; 2] = ["initialExtent", "fullExtent"];

/// Rewrites `item.extent` and the service's initial/full extents.
///
/// The concrete service extent (initial first, else full) is kept as
/// `defaultExtent` before being overwritten.
pub(super) fn templatize_extents(document: &mut Value) {
    if let Some(extent) = document.pointer_mut("/item/extent") {
        if extent.as_array().is_some_and(|bounds| !bounds.is_empty()) {
            *extent = Value::String(token(SOLUTION_ITEM_EXTENT));
        }
    }

    let Some(Value::Object(service)) = document.pointer_mut("/properties/service") else {
        return;
    };
    let chosen = SERVICE_EXTENTS
        .iter()
        .find_map(|prop| service.get(*prop).filter(|v| v.is_object()).cloned());
    let Some(chosen) = chosen else {
        return;
    };
    let _ = service.insert("defaultExtent".to_owned(), chosen);
    for prop in SERVICE_EXTENTS {
        if let Some(extent) = service.get_mut(prop).filter(|v| v.is_object()) {
            *extent = Value::String(token(SOLUTION_EXTENT));
        }
    }
}
