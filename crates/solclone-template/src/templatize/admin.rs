//! Admin layer info of view layers.
//!
//! A view names its source service by `sourceServiceName`; that name is
//! matched against the supplied dependencies and replaced by the
//! dependency's `{{key.name}}` token. Field references inside the view
//! definition point into the source service's layers.

use serde_json::Value;
use solclone_common::types::DependencyRef;

use super::Discovered;
use crate::field_ref::{templatize_field_array, templatize_field_list, templatize_field_prop};
use crate::placeholder::{field_base_path, item_name, whole_placeholder_path};

/// Finds the dependency whose service name is `name`.
///
/// Exact matches win over case-insensitive ones; `None` when nothing
/// matches.
#[must_use]
pub fn dependant_item<'a>(name: &str, deps: &'a [DependencyRef]) -> Option<&'a DependencyRef> {
    deps.iter()
        .find(|d| d.name.as_deref() == Some(name))
        .or_else(|| {
            deps.iter().find(|d| {
                d.name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
        })
}

/// Rewrites `layer.adminLayerInfo`, recording every source service found.
pub(super) fn templatize_admin_layer_info(
    layer: &mut Value,
    deps: &[DependencyRef],
    found: &mut Discovered,
) {
    let multi_service = layer
        .get("isMultiServicesView")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let Some(admin) = layer.get_mut("adminLayerInfo") else {
        return;
    };
    let primary = match admin.get_mut("viewLayerDefinition") {
        Some(view_def) => templatize_view_definition(view_def, deps, found),
        None => None,
    };
    if multi_service {
        if let (Some(dep_key), Some(geometry)) = (primary, admin.get_mut("geometryField")) {
            qualify_geometry_field(geometry, &dep_key);
        }
    }
}

fn templatize_view_definition(
    view_def: &mut Value,
    deps: &[DependencyRef],
    found: &mut Discovered,
) -> Option<String> {
    let Some(table) = view_def.get_mut("table").filter(|t| t.is_object()) else {
        return templatize_source(view_def, deps, found);
    };
    let primary = templatize_source(table, deps, found);
    if let Some(Value::Array(related)) = table.get_mut("relatedTables") {
        for related_table in related {
            let _ = templatize_source(related_table, deps, found);
        }
    }
    primary
}

/// Rewrites one source definition (a view table or a related table).
///
/// Returns the key of the dependency it points to.
fn templatize_source(
    def: &mut Value,
    deps: &[DependencyRef],
    found: &mut Discovered,
) -> Option<String> {
    let Some(Value::String(name)) = def.get_mut("sourceServiceName") else {
        return None;
    };
    let dep_key = if let Some(path) = whole_placeholder_path(name) {
        path.strip_suffix(".name")?.to_owned()
    } else {
        let Some(dep) = dependant_item(name, deps) else {
            tracing::debug!(source = %name, "view source service is not a known dependency");
            return None;
        };
        *name = item_name(&dep.key);
        dep.key.clone()
    };
    found.insert(&dep_key);

    if let Some(obj) = def.as_object_mut() {
        let _ = obj.remove("sourceId");
    }
    let layer_id = def.get("sourceLayerId").and_then(Value::as_u64).unwrap_or(0);
    let base_path = field_base_path(&dep_key, layer_id);

    if let Some(Value::Array(fields)) = def.get_mut("sourceLayerFields") {
        for field in fields {
            let _ = templatize_field_prop(field, "source", &base_path);
        }
    }
    if let Some(top_filter) = def.get_mut("topFilter") {
        for prop in ["groupByFields", "orderByFields"] {
            if let Some(Value::String(list)) = top_filter.get_mut(prop) {
                *list = templatize_field_list(list, &base_path);
            }
        }
    }
    templatize_field_array(def, "keyFields", &base_path);
    templatize_field_array(def, "parentKeyFields", &base_path);
    Some(dep_key)
}

fn qualify_geometry_field(geometry: &mut Value, dep_key: &str) {
    let Some(Value::String(name)) = geometry.get_mut("name") else {
        return;
    };
    if name.starts_with("{{") {
        return;
    }
    let bare = name.rsplit('.').next().unwrap_or(name.as_str()).to_owned();
    *name = format!("{}.{bare}", item_name(dep_key));
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn deps() -> Vec<DependencyRef> {
        vec![
            DependencyRef::new("aaa", Some("Parcels")),
            DependencyRef::new("bbb", Some("Owners")),
        ]
    }

    #[test]
    fn dependant_item_matches_by_name() {
        let deps = deps();
        assert_eq!(dependant_item("Parcels", &deps).map(|d| d.key.as_str()), Some("aaa"));
        assert_eq!(dependant_item("owners", &deps).map(|d| d.key.as_str()), Some("bbb"));
        assert!(dependant_item("Roads", &deps).is_none());
    }

    #[test]
    fn single_source_view_is_templatized() {
        let mut layer = json!({
            "id": 0,
            "adminLayerInfo": {"viewLayerDefinition": {
                "sourceServiceName": "Parcels",
                "sourceLayerId": 2,
                "sourceId": 1234,
                "sourceLayerFields": [{"name": "APN", "source": "APN"}],
                "topFilter": {"groupByFields": "APN", "orderByFields": "EditDate DESC", "topCount": 1}
            }}
        });
        let mut found = Discovered::default();
        templatize_admin_layer_info(&mut layer, &deps(), &mut found);
        let def = &layer["adminLayerInfo"]["viewLayerDefinition"];
        assert_eq!(def["sourceServiceName"], "{{aaa.name}}");
        assert!(def.get("sourceId").is_none());
        assert_eq!(def["sourceLayerFields"][0]["source"], "{{aaa.layer2.fields.apn.name}}");
        assert_eq!(def["sourceLayerFields"][0]["name"], "APN");
        assert_eq!(def["topFilter"]["groupByFields"], "{{aaa.layer2.fields.apn.name}}");
        assert_eq!(def["topFilter"]["orderByFields"], "{{aaa.layer2.fields.editdate.name}} DESC");
        assert_eq!(found.into_vec(), vec!["aaa"]);
    }

    #[test]
    fn joined_view_recurses_into_related_tables() {
        let mut layer = json!({
            "id": 0,
            "isMultiServicesView": true,
            "adminLayerInfo": {
                "geometryField": {"name": "Parcels.Shape"},
                "viewLayerDefinition": {"table": {
                    "sourceServiceName": "Parcels",
                    "sourceLayerId": 0,
                    "sourceId": 1,
                    "relatedTables": [{
                        "sourceServiceName": "Owners",
                        "sourceLayerId": 1,
                        "sourceId": 2,
                        "keyFields": ["OWNER_ID"],
                        "parentKeyFields": ["PARCEL_OWNER"],
                        "topFilter": {"groupByFields": "OWNER_ID"}
                    }]
                }}
            }
        });
        let mut found = Discovered::default();
        templatize_admin_layer_info(&mut layer, &deps(), &mut found);
        let admin = &layer["adminLayerInfo"];
        let related = &admin["viewLayerDefinition"]["table"]["relatedTables"][0];
        assert_eq!(related["sourceServiceName"], "{{bbb.name}}");
        assert!(related.get("sourceId").is_none());
        assert_eq!(related["keyFields"][0], "{{bbb.layer1.fields.owner_id.name}}");
        assert_eq!(related["parentKeyFields"][0], "{{bbb.layer1.fields.parcel_owner.name}}");
        assert_eq!(related["topFilter"]["groupByFields"], "{{bbb.layer1.fields.owner_id.name}}");
        assert_eq!(admin["geometryField"]["name"], "{{aaa.name}}.Shape");
        assert_eq!(found.into_vec(), vec!["aaa", "bbb"]);
    }

    #[test]
    fn unknown_source_is_left_untouched() {
        let mut layer = json!({"adminLayerInfo": {"viewLayerDefinition": {
            "sourceServiceName": "Roads", "sourceId": 9
        }}});
        let mut found = Discovered::default();
        templatize_admin_layer_info(&mut layer, &deps(), &mut found);
        let def = &layer["adminLayerInfo"]["viewLayerDefinition"];
        assert_eq!(def["sourceServiceName"], "Roads");
        assert_eq!(def["sourceId"], 9);
        assert!(found.into_vec().is_empty());
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut layer = json!({
            "isMultiServicesView": true,
            "adminLayerInfo": {
                "geometryField": {"name": "Shape"},
                "viewLayerDefinition": {"sourceServiceName": "Parcels", "sourceLayerFields": [{"source": "A"}]}
            }
        });
        let mut found = Discovered::default();
        templatize_admin_layer_info(&mut layer, &deps(), &mut found);
        let once = layer.clone();
        templatize_admin_layer_info(&mut layer, &deps(), &mut found);
        assert_eq!(layer, once);
        assert_eq!(layer["adminLayerInfo"]["geometryField"]["name"], "{{aaa.name}}.Shape");
    }
}
