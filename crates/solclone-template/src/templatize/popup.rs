//! Popup configuration.

use serde_json::Value;

use super::layer::LayerContext;
use crate::field_ref::{
    Notation, direct_token, split_relationship_path, templatize_field_array,
    templatize_field_prop, templatize_text_prop,
};

/// Rewrites a `popupInfo` object.
pub(super) fn templatize_popup(popup: &mut Value, ctx: &LayerContext) {
    for prop in ["title", "description"] {
        templatize_text_prop(popup, prop, &ctx.fields, &ctx.base_path, Notation::Braced);
    }
    templatize_field_infos(popup, ctx);
    templatize_media_infos(popup, ctx);
    if let Some(Value::Array(expressions)) = popup.get_mut("expressionInfos") {
        for expression in expressions {
            templatize_text_prop(expression, "expression", &ctx.fields, &ctx.base_path, Notation::Arcade);
        }
    }
    if let Some(Value::Array(elements)) = popup.get_mut("popupElements") {
        for element in elements {
            templatize_popup_element(element, ctx);
        }
    }
}

fn templatize_popup_element(element: &mut Value, ctx: &LayerContext) {
    templatize_field_infos(element, ctx);
    templatize_media_infos(element, ctx);
    for prop in ["text", "title", "description"] {
        templatize_text_prop(element, prop, &ctx.fields, &ctx.base_path, Notation::Braced);
    }
}

fn templatize_field_infos(owner: &mut Value, ctx: &LayerContext) {
    let Some(Value::Array(field_infos)) = owner.get_mut("fieldInfos") else {
        return;
    };
    for field_info in field_infos {
        if let Some(Value::String(name)) = field_info.get_mut("fieldName") {
            if let Some(updated) = field_info_name(name, ctx) {
                *name = updated;
            }
        }
    }
}

/// Token for a popup `fieldName`; compound relationship paths keep their
/// prefix and take the related table's base path.
fn field_info_name(name: &str, ctx: &LayerContext) -> Option<String> {
    let Some(path) = split_relationship_path(name) else {
        return direct_token(name, &ctx.base_path);
    };
    let Some(related) = ctx.related_layer(path.relationship_id) else {
        tracing::debug!(field = name, "popup relationship has no known related table");
        return None;
    };
    let token = direct_token(path.field, &ctx.base_path_for(related))?;
    Some(format!("{}{token}", path.prefix))
}

fn templatize_media_infos(owner: &mut Value, ctx: &LayerContext) {
    let Some(Value::Array(media_infos)) = owner.get_mut("mediaInfos") else {
        return;
    };
    for media in media_infos {
        for prop in ["title", "caption"] {
            templatize_text_prop(media, prop, &ctx.fields, &ctx.base_path, Notation::Braced);
        }
        if let Some(value) = media.get_mut("value") {
            templatize_field_array(value, "fields", &ctx.base_path);
            let _ = templatize_field_prop(value, "tooltipField", &ctx.base_path);
            let _ = templatize_field_prop(value, "normalizeField", &ctx.base_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn layer_ctx() -> LayerContext {
        LayerContext::from_layer(
            "X",
            &json!({
                "id": 0,
                "fields": [{"name": "OWNER"}, {"name": "AREA"}],
                "relationships": [{"id": 0, "relatedTableId": 1}]
            }),
        )
        .expect("ctx")
    }

    #[test]
    fn relationship_path_uses_related_table() {
        let mut popup = json!({"fieldInfos": [{"fieldName": "relationships/0/AA"}]});
        templatize_popup(&mut popup, &layer_ctx());
        assert_eq!(
            popup["fieldInfos"][0]["fieldName"],
            "relationships/0/{{X.layer1.fields.aa.name}}"
        );
    }

    #[test]
    fn unknown_relationship_is_left_alone() {
        let mut popup = json!({"fieldInfos": [{"fieldName": "relationships/7/AA"}]});
        templatize_popup(&mut popup, &layer_ctx());
        assert_eq!(popup["fieldInfos"][0]["fieldName"], "relationships/7/AA");
    }

    #[test]
    fn text_expressions_and_field_infos() {
        let mut popup = json!({
            "title": "{OWNER}",
            "description": "<div>Area: <b>{AREA}</b></div>",
            "fieldInfos": [{"fieldName": "OWNER"}, {"fieldName": "expression/expr0"}],
            "expressionInfos": [{"name": "expr0", "expression": "$feature[\"AREA\"] / 10"}]
        });
        templatize_popup(&mut popup, &layer_ctx());
        assert_eq!(popup["title"], "{{{X.layer0.fields.owner.name}}}");
        assert_eq!(popup["description"], "<div>Area: <b>{{{X.layer0.fields.area.name}}}</b></div>");
        assert_eq!(popup["fieldInfos"][0]["fieldName"], "{{X.layer0.fields.owner.name}}");
        assert_eq!(popup["fieldInfos"][1]["fieldName"], "expression/expr0");
        assert_eq!(
            popup["expressionInfos"][0]["expression"],
            "$feature[\"{{X.layer0.fields.area.name}}\"] / 10"
        );
    }

    #[test]
    fn popup_elements_and_media() {
        let mut popup = json!({
            "popupElements": [
                {"type": "text", "text": "Owned by {OWNER}"},
                {"type": "fields", "fieldInfos": [{"fieldName": "AREA"}]},
                {"type": "media", "mediaInfos": [{
                    "title": "{OWNER}",
                    "value": {"fields": ["AREA"], "tooltipField": "OWNER", "normalizeField": "AREA"}
                }]}
            ]
        });
        templatize_popup(&mut popup, &layer_ctx());
        let elements = &popup["popupElements"];
        assert_eq!(elements[0]["text"], "Owned by {{{X.layer0.fields.owner.name}}}");
        assert_eq!(elements[1]["fieldInfos"][0]["fieldName"], "{{X.layer0.fields.area.name}}");
        let media = &elements[2]["mediaInfos"][0];
        assert_eq!(media["title"], "{{{X.layer0.fields.owner.name}}}");
        assert_eq!(media["value"]["fields"][0], "{{X.layer0.fields.area.name}}");
        assert_eq!(media["value"]["tooltipField"], "{{X.layer0.fields.owner.name}}");
        assert_eq!(media["value"]["normalizeField"], "{{X.layer0.fields.area.name}}");
    }
}
