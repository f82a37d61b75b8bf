//! Layer time info.

use serde_json::Value;

use super::layer::LayerContext;
use crate::field_ref::templatize_field_value;

const TIME_FIELDS: [&str; 3] = ["startTimeField", "endTimeField", "trackIdField"];

/// Rewrites the time fields; empty names become `null`.
pub(super) fn templatize_time_info(layer: &mut Value, ctx: &LayerContext) {
    let Some(time_info) = layer.get_mut("timeInfo") else {
        return;
    };
    for prop in TIME_FIELDS {
        if let Some(value) = time_info.get_mut(prop) {
            if value.as_str() == Some("") {
                *value = Value::Null;
            } else {
                let _ = templatize_field_value(value, &ctx.base_path);
            }
        }
    }
}
