//! Edit templates, type templates and type domains.
//!
//! Field names appear here as object keys, so the keys themselves are
//! rewritten while the values are kept.

use serde_json::Value;

use super::layer::LayerContext;
use crate::field_ref::direct_token;

/// Rewrites `templates[].prototype.attributes` and every type's templates
/// and domains.
pub(super) fn templatize_templates(layer: &mut Value, ctx: &LayerContext) {
    if let Some(Value::Array(templates)) = layer.get_mut("templates") {
        for template in templates {
            templatize_prototype(template, ctx);
        }
    }
    let Some(Value::Array(types)) = layer.get_mut("types") else {
        return;
    };
    for type_def in types {
        if let Some(Value::Array(templates)) = type_def.get_mut("templates") {
            for template in templates {
                templatize_prototype(template, ctx);
            }
        }
        if let Some(domains) = type_def.get_mut("domains") {
            rewrite_keys(domains, &ctx.base_path);
        }
    }
}

fn templatize_prototype(template: &mut Value, ctx: &LayerContext) {
    if let Some(attributes) = template.pointer_mut("/prototype/attributes") {
        rewrite_keys(attributes, &ctx.base_path);
    }
}

fn rewrite_keys(obj: &mut Value, base_path: &str) {
    let Value::Object(map) = obj else {
        return;
    };
    for (key, value) in std::mem::take(map) {
        let key = direct_token(&key, base_path).unwrap_or(key);
        let _ = map.insert(key, value);
    }
}
