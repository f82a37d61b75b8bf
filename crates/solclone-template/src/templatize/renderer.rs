//! Drawing info: renderers and their visual variables.

use serde_json::Value;

use super::labeling;
use super::layer::LayerContext;
use crate::field_ref::{
    Notation, templatize_field_array, templatize_field_prop, templatize_quoted_literals,
    templatize_text_prop,
};

const TEMPORAL_SUB_RENDERERS: [&str; 3] =
    ["observationRenderer", "latestObservationRenderer", "trackRenderer"];

/// Rewrites `drawingInfo.renderer` and `drawingInfo.labelingInfo`.
pub(super) fn templatize_drawing_info(drawing_info: &mut Value, ctx: &LayerContext) {
    if let Some(renderer) = drawing_info.get_mut("renderer") {
        templatize_renderer(renderer, ctx);
    }
    if let Some(labeling_info) = drawing_info.get_mut("labelingInfo") {
        labeling::templatize_labeling_info(labeling_info, ctx);
    }
}

/// Rewrites one renderer according to its `type`.
pub(super) fn templatize_renderer(renderer: &mut Value, ctx: &LayerContext) {
    let kind = renderer
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let predominance = renderer
        .pointer("/authoringInfo/type")
        .and_then(Value::as_str)
        == Some("predominance");

    if predominance {
        templatize_predominance(renderer, ctx);
    }
    templatize_text_prop(renderer, "valueExpression", &ctx.fields, &ctx.base_path, Notation::Arcade);
    templatize_text_prop(renderer, "rotationExpression", &ctx.fields, &ctx.base_path, Notation::Bracketed);
    let _ = templatize_field_prop(renderer, "normalizationField", &ctx.base_path);
    templatize_visual_variables(renderer, ctx);
    if let Some(authoring) = renderer.get_mut("authoringInfo") {
        let _ = templatize_field_prop(authoring, "field1", &ctx.base_path);
        let _ = templatize_field_prop(authoring, "field2", &ctx.base_path);
        templatize_visual_variables(authoring, ctx);
    }

    match kind.as_str() {
        "uniqueValue" => {
            for prop in ["field1", "field2", "field3"] {
                let _ = templatize_field_prop(renderer, prop, &ctx.base_path);
            }
        }
        "classBreaks" | "heatmap" => {
            let _ = templatize_field_prop(renderer, "field", &ctx.base_path);
        }
        "temporal" => {
            for prop in TEMPORAL_SUB_RENDERERS {
                if let Some(sub) = renderer.get_mut(prop) {
                    templatize_renderer(sub, ctx);
                }
            }
        }
        "dotDensity" => {
            if let Some(Value::Array(attributes)) = renderer.get_mut("attributes") {
                for attribute in attributes {
                    let _ = templatize_field_prop(attribute, "field", &ctx.base_path);
                    templatize_text_prop(attribute, "valueExpression", &ctx.fields, &ctx.base_path, Notation::Arcade);
                }
            }
        }
        "simple" => {}
        other => tracing::trace!(renderer = other, "no field-bearing properties known"),
    }
}

/// Predominance keeps its field names twice: in `authoringInfo.fields` and
/// as string literals inside the generated Arcade expression.
fn templatize_predominance(renderer: &mut Value, ctx: &LayerContext) {
    let fields: Vec<String> = renderer
        .pointer("/authoringInfo/fields")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default();
    if let Some(Value::String(expression)) = renderer.get_mut("valueExpression") {
        for field in &fields {
            *expression = templatize_quoted_literals(expression, field, &ctx.base_path);
        }
    }
    templatize_text_prop(renderer, "valueExpression", &fields, &ctx.base_path, Notation::Arcade);
    if let Some(authoring) = renderer.get_mut("authoringInfo") {
        templatize_field_array(authoring, "fields", &ctx.base_path);
    }
}

fn templatize_visual_variables(owner: &mut Value, ctx: &LayerContext) {
    let Some(Value::Array(variables)) = owner.get_mut("visualVariables") else {
        return;
    };
    for variable in variables {
        let _ = templatize_field_prop(variable, "field", &ctx.base_path);
        let _ = templatize_field_prop(variable, "normalizationField", &ctx.base_path);
        templatize_text_prop(variable, "valueExpression", &ctx.fields, &ctx.base_path, Notation::Arcade);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn ctx() -> LayerContext {
        LayerContext::from_layer(
            "X",
            &json!({"id": 0, "fields": [{"name": "POP_A"}, {"name": "POP_B"}, {"name": "TYPE"}]}),
        )
        .expect("ctx")
    }

    #[test]
    fn unique_value_fields() {
        let mut r = json!({"type": "uniqueValue", "field1": "TYPE", "field2": null});
        templatize_renderer(&mut r, &ctx());
        assert_eq!(r["field1"], "{{X.layer0.fields.type.name}}");
        assert!(r["field2"].is_null());
    }

    #[test]
    fn class_breaks_and_visual_variables() {
        let mut r = json!({
            "type": "classBreaks",
            "field": "POP_A",
            "normalizationField": "POP_B",
            "visualVariables": [{"type": "sizeInfo", "field": "POP_B", "valueExpression": "$feature.POP_A * 2"}]
        });
        templatize_renderer(&mut r, &ctx());
        assert_eq!(r["field"], "{{X.layer0.fields.pop_a.name}}");
        assert_eq!(r["normalizationField"], "{{X.layer0.fields.pop_b.name}}");
        assert_eq!(r["visualVariables"][0]["field"], "{{X.layer0.fields.pop_b.name}}");
        assert_eq!(r["visualVariables"][0]["valueExpression"], "$feature.{{X.layer0.fields.pop_a.name}} * 2");
    }

    #[test]
    fn heatmap_field() {
        let mut r = json!({"type": "heatmap", "field": "POP_A"});
        templatize_renderer(&mut r, &ctx());
        assert_eq!(r["field"], "{{X.layer0.fields.pop_a.name}}");
    }

    #[test]
    fn temporal_recurses_into_three_sub_renderers() {
        let mut r = json!({
            "type": "temporal",
            "observationRenderer": {"type": "uniqueValue", "field1": "TYPE"},
            "latestObservationRenderer": {"type": "classBreaks", "field": "POP_A"},
            "trackRenderer": {"type": "simple", "visualVariables": [{"field": "POP_B"}]}
        });
        templatize_renderer(&mut r, &ctx());
        assert_eq!(r["observationRenderer"]["field1"], "{{X.layer0.fields.type.name}}");
        assert_eq!(r["latestObservationRenderer"]["field"], "{{X.layer0.fields.pop_a.name}}");
        assert_eq!(r["trackRenderer"]["visualVariables"][0]["field"], "{{X.layer0.fields.pop_b.name}}");
    }

    #[test]
    fn predominance_updates_list_and_expression_consistently() {
        let mut r = json!({
            "type": "uniqueValue",
            "authoringInfo": {"type": "predominance", "fields": ["POP_A", "POP_B"]},
            "valueExpression": "var fieldNames = [\"POP_A\", \"POP_B\"]; return Max($feature.POP_A, $feature[\"POP_B\"]);"
        });
        templatize_renderer(&mut r, &ctx());
        assert_eq!(
            r["authoringInfo"]["fields"],
            json!(["{{X.layer0.fields.pop_a.name}}", "{{X.layer0.fields.pop_b.name}}"])
        );
        assert_eq!(
            r["valueExpression"],
            "var fieldNames = [\"{{X.layer0.fields.pop_a.name}}\", \"{{X.layer0.fields.pop_b.name}}\"]; \
             return Max($feature.{{X.layer0.fields.pop_a.name}}, $feature[\"{{X.layer0.fields.pop_b.name}}\"]);"
        );
    }

    #[test]
    fn drawing_info_without_renderer_is_ignored() {
        let mut d = json!({"transparency": 0});
        templatize_drawing_info(&mut d, &ctx());
        assert_eq!(d, json!({"transparency": 0}));
    }
}
