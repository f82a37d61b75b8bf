//! Definition queries and the definition editor.

use serde_json::Value;

use super::layer::LayerContext;
use crate::field_ref::{Notation, templatize_field_prop, templatize_text_prop};

const QUERY_PROPS: [&str; 3] = ["definitionQuery", "viewDefinitionQuery", "definitionExpression"];

/// Rewrites the SQL-like filters of a layer and its definition editor.
pub(super) fn templatize_definitions(layer: &mut Value, ctx: &LayerContext) {
    for prop in QUERY_PROPS {
        templatize_text_prop(layer, prop, &ctx.fields, &ctx.base_path, Notation::Delimited);
    }
    if let Some(editor) = layer.get_mut("definitionEditor") {
        templatize_definition_editor(editor, ctx);
    }
}

/// The parameterized expression is free text; each input parameter names
/// its field directly and is rewritten on its own.
fn templatize_definition_editor(editor: &mut Value, ctx: &LayerContext) {
    templatize_text_prop(
        editor,
        "parameterizedExpression",
        &ctx.fields,
        &ctx.base_path,
        Notation::Delimited,
    );
    let Some(Value::Array(inputs)) = editor.get_mut("inputs") else {
        return;
    };
    for input in inputs {
        if let Some(Value::Array(parameters)) = input.get_mut("parameters") {
            for parameter in parameters {
                let _ = templatize_field_prop(parameter, "fieldName", &ctx.base_path);
            }
        }
    }
}
