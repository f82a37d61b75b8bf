//! Field name mapping of created layers.
//!
//! A created layer may not keep every source field name: reserved words
//! get suffixed and some destinations replace the edit tracking fields.
//! The mapping built here is what the dictionary stores under
//! `layer<N>.fields`.

use std::collections::BTreeMap;

use solclone_common::types::{FieldDef, LayerFieldInfo};

/// Lower-cased source field name to the field as it now exists.
pub type FieldMapping = BTreeMap<String, FieldDef>;

/// Builds the mapping for one layer.
///
/// A source field maps to the new field with the same name (ignoring
/// case), else to the new field with the same alias. When the destination
/// disallows schema changes and names a different physical field for an
/// edit tracking role, that field wins for the role's source field.
#[must_use]
pub fn name_mapping(info: &LayerFieldInfo) -> FieldMapping {
    let mut mapping = FieldMapping::new();
    for source in &info.source_fields {
        let target = info
            .new_fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(&source.name))
            .or_else(|| {
                info.new_fields
                    .iter()
                    .find(|f| !source.alias.is_empty() && f.alias == source.alias)
            });
        match target {
            Some(field) => {
                let _ = mapping.insert(source.name.to_lowercase(), field.clone());
            }
            None => tracing::debug!(
                layer = info.layer_id,
                field = %source.name,
                "source field has no counterpart in the new schema"
            ),
        }
    }

    if info.source_schema_changes_allowed {
        return mapping;
    }
    let (Some(old), Some(new)) = (&info.edit_fields_info, &info.new_edit_fields_info) else {
        return mapping;
    };
    for (role, old_field) in old.roles() {
        let (Some(old_field), Some(new_field)) = (old_field, new.field_for(role)) else {
            continue;
        };
        if old_field.eq_ignore_ascii_case(new_field) {
            continue;
        }
        let replacement = info
            .new_fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(new_field))
            .cloned()
            .unwrap_or_else(|| {
                let source = info.source_fields.iter().find(|f| f.name.eq_ignore_ascii_case(old_field));
                FieldDef::new(
                    new_field,
                    source.map_or(new_field, |f| f.alias.as_str()),
                    source.map_or("", |f| f.field_type.as_str()),
                )
            });
        tracing::trace!(role, from = old_field, to = %replacement.name, "edit tracking field moved");
        let _ = mapping.insert(old_field.to_lowercase(), replacement);
    }
    mapping
}

/// Applies [`name_mapping`] to every layer that reported its new schema.
#[must_use]
pub fn post_process_fields(infos: &[LayerFieldInfo]) -> BTreeMap<u64, FieldMapping> {
    infos
        .iter()
        .filter(|info| {
            let complete = !info.source_fields.is_empty() && !info.new_fields.is_empty();
            if !complete {
                tracing::debug!(layer = info.layer_id, "skipping layer without field data");
            }
            complete
        })
        .map(|info| (info.layer_id, name_mapping(info)))
        .collect()
}
