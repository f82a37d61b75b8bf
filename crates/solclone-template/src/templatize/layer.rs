//! Layer and table visitor.
//!
//! Builds the per-layer context (base path, field names, related tables)
//! and dispatches to the field-bearing sub-structure visitors.

use std::collections::BTreeMap;

use serde_json::Value;
use solclone_common::types::DependencyRef;

use super::{Discovered, admin, definition, popup, renderer, templates, time_info};
use crate::field_ref::templatize_field_prop;
use crate::placeholder::{contains_placeholder, field_base_path, item_id, layer_url};

const DESTINATION_ROLE: &str = "esriRelRoleDestination";

/// What a visitor needs to know about the layer it is rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerContext {
    /// Key of the owning item.
    pub key: String,
    /// Layer id within the item.
    pub layer_id: u64,
    /// `key.layer<n>.fields`
    pub base_path: String,
    /// Raw names of the layer's fields, in schema order.
    pub fields: Vec<String>,
    relationships: BTreeMap<u64, u64>,
    view_related: Vec<u64>,
}

impl LayerContext {
    /// Builds a context for a layer definition.
    ///
    /// Returns `None` when the layer carries no numeric `id`.
    #[must_use]
    pub fn from_layer(key: &str, layer: &Value) -> Option<Self> {
        let layer_id = layer.get("id").and_then(Value::as_u64)?;
        let fields = layer
            .get("fields")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.get("name").and_then(Value::as_str))
                    .filter(|name| !contains_placeholder(name))
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let relationships = layer
            .get("relationships")
            .and_then(Value::as_array)
            .map(|rels| {
                rels.iter()
                    .filter_map(|r| {
                        Some((
                            r.get("id").and_then(Value::as_u64)?,
                            r.get("relatedTableId").and_then(Value::as_u64)?,
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();
        let view_related = layer
            .pointer("/adminLayerInfo/viewLayerDefinition/table/relatedTables")
            .and_then(Value::as_array)
            .map(|tables| {
                tables
                    .iter()
                    .filter_map(|t| t.get("sourceLayerId").and_then(Value::as_u64))
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            key: key.to_owned(),
            layer_id,
            base_path: field_base_path(key, layer_id),
            fields,
            relationships,
            view_related,
        })
    }

    /// Base path for another layer of the same item.
    #[must_use]
    pub fn base_path_for(&self, layer_id: u64) -> String {
        field_base_path(&self.key, layer_id)
    }

    /// Layer id of the table on the far side of relationship `id`.
    ///
    /// Looks at the layer's `relationships` first, then at the related
    /// tables of a view's admin layer info.
    #[must_use]
    pub fn related_layer(&self, relationship_id: u64) -> Option<u64> {
        self.relationships.get(&relationship_id).copied().or_else(|| {
            usize::try_from(relationship_id)
                .ok()
                .and_then(|idx| self.view_related.get(idx).copied())
        })
    }
}

/// Rewrites one service layer or table definition.
pub(super) fn templatize_layer(
    layer: &mut Value,
    ctx: &LayerContext,
    deps: &[DependencyRef],
    found: &mut Discovered,
) {
    templatize_identity(layer, ctx, deps, found);
    admin::templatize_admin_layer_info(layer, deps, found);
    templatize_relationships(layer, ctx);
    definition::templatize_definitions(layer, ctx);
    if let Some(drawing_info) = layer.get_mut("drawingInfo") {
        renderer::templatize_drawing_info(drawing_info, ctx);
    }
    time_info::templatize_time_info(layer, ctx);
    templates::templatize_templates(layer, ctx);
    if let Some(popup_info) = layer.get_mut("popupInfo") {
        popup::templatize_popup(popup_info, ctx);
    }
}

/// Rewrites the item-data counterpart of a layer (popup and overrides).
pub(super) fn templatize_data_layer(data_layer: &mut Value, ctx: &LayerContext) {
    if let Some(popup_info) = data_layer.get_mut("popupInfo") {
        popup::templatize_popup(popup_info, ctx);
    }
    if let Some(definition) = data_layer.get_mut("layerDefinition") {
        definition::templatize_definitions(definition, ctx);
        if let Some(drawing_info) = definition.get_mut("drawingInfo") {
            renderer::templatize_drawing_info(drawing_info, ctx);
        }
    }
}

fn templatize_identity(
    layer: &mut Value,
    ctx: &LayerContext,
    deps: &[DependencyRef],
    found: &mut Discovered,
) {
    if let Some(Value::String(url)) = layer.get_mut("url") {
        if !url.is_empty() && !contains_placeholder(url) {
            *url = layer_url(&ctx.key, ctx.layer_id);
        }
    }
    if let Some(Value::String(service_item_id)) = layer.get_mut("serviceItemId") {
        if *service_item_id == ctx.key {
            *service_item_id = item_id(&ctx.key);
        } else if deps.iter().any(|d| d.key == *service_item_id) {
            found.insert(service_item_id.as_str());
            *service_item_id = item_id(service_item_id);
        }
    }
}

fn templatize_relationships(layer: &mut Value, ctx: &LayerContext) {
    let Some(Value::Array(relationships)) = layer.get_mut("relationships") else {
        return;
    };
    for relationship in relationships {
        let role = relationship.get("role").and_then(Value::as_str);
        let related = relationship.get("relatedTableId").and_then(Value::as_u64);
        let base_path = match (role, related) {
            (Some(DESTINATION_ROLE), Some(id)) => ctx.base_path_for(id),
            _ => ctx.base_path.clone(),
        };
        let _ = templatize_field_prop(relationship, "keyField", &base_path);
    }
}
