//! Labeling info.

use serde_json::Value;

use super::layer::LayerContext;
use crate::field_ref::{Notation, templatize_field_prop, templatize_text_prop};

/// Rewrites every label class.
///
/// `labelExpression` uses `[FIELD]`, `labelExpressionInfo.value` uses
/// `{FIELD}`, `labelExpressionInfo.expression` is Arcade and `where` is
/// SQL-like.
pub(super) fn templatize_labeling_info(labeling_info: &mut Value, ctx: &LayerContext) {
    let Value::Array(classes) = labeling_info else {
        return;
    };
    for class in classes {
        templatize_text_prop(class, "labelExpression", &ctx.fields, &ctx.base_path, Notation::Bracketed);
        templatize_text_prop(class, "where", &ctx.fields, &ctx.base_path, Notation::Delimited);
        if let Some(info) = class.get_mut("labelExpressionInfo") {
            templatize_text_prop(info, "value", &ctx.fields, &ctx.base_path, Notation::Braced);
            templatize_text_prop(info, "expression", &ctx.fields, &ctx.base_path, Notation::Arcade);
        }
        if let Some(Value::Array(field_infos)) = class.get_mut("fieldInfos") {
            for field_info in field_infos {
                let _ = templatize_field_prop(field_info, "fieldName", &ctx.base_path);
            }
        }
    }
}
