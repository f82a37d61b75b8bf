//! Structural templatizer.
//!
//! Walks the known sub-structures of an item document and rewrites every
//! concrete identifier, url and field name into a placeholder. Each shape
//! has its own visitor module; this module sequences them and collects the
//! dependencies they discover.
//!
//! Every rewrite skips values that already hold a placeholder, so
//! templatizing a document twice leaves it unchanged.

mod admin;
mod definition;
mod extent;
mod ids;
mod item;
mod labeling;
mod layer;
mod popup;
mod renderer;
mod templates;
mod time_info;

use std::collections::BTreeSet;

use serde_json::Value;
use solclone_common::types::{DependencyRef, ItemTemplate};

pub use admin::dependant_item;
pub use layer::LayerContext;

const LAYER_COLLECTIONS: [&str; 2] = ["layers", "tables"];

/// Dependency keys found while templatizing one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplatizeOutcome {
    /// Keys of the items the document now references through placeholders.
    pub dependencies: BTreeSet<String>,
}

/// Accumulator threaded through the visitors.
#[derive(Debug, Default)]
pub(crate) struct Discovered(BTreeSet<String>);

impl Discovered {
    pub(crate) fn insert(&mut self, key: &str) {
        if !key.is_empty() && !self.0.contains(key) {
            let _ = self.0.insert(key.to_owned());
        }
    }

    #[cfg(test)]
    pub(crate) fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }

    fn into_outcome(self) -> TemplatizeOutcome {
        TemplatizeOutcome {
            dependencies: self.0,
        }
    }
}

/// Templatizes a raw item document in place.
///
/// `key` is the item's own source id; `deps` lists the other items it may
/// reference. Returns the dependencies discovered, never including `key`.
pub fn templatize_document(key: &str, document: &mut Value, deps: &[DependencyRef]) -> TemplatizeOutcome {
    let mut found = Discovered::default();
    item::templatize_item(document, key);
    extent::templatize_extents(document);
    let contexts = templatize_service_layers(key, document, deps, &mut found);
    templatize_data_layers(document, &contexts);

    let ids: Vec<&str> = std::iter::once(key)
        .chain(deps.iter().map(|d| d.key.as_str()))
        .collect();
    ids::templatize_ids(document, key, &ids, &mut found);

    let outcome = found.into_outcome();
    tracing::debug!(
        key,
        dependencies = outcome.dependencies.len(),
        "document templatized"
    );
    outcome
}

/// Templatizes a template's document and merges the discovered
/// dependencies into `template.dependencies`.
///
/// Keys already listed in `template.dependencies` are treated as
/// references too, even when `deps` does not mention them.
pub fn templatize(template: &mut ItemTemplate, deps: &[DependencyRef]) -> TemplatizeOutcome {
    let mut known: Vec<DependencyRef> = deps.to_vec();
    for dep in &template.dependencies {
        if !known.iter().any(|d| d.key == *dep) {
            known.push(DependencyRef::new(dep.clone(), None));
        }
    }
    let outcome = templatize_document(&template.key, &mut template.document, &known);
    for dep in &outcome.dependencies {
        if template.add_dependency(dep.clone()) {
            tracing::trace!(key = %template.key, dependency = %dep, "dependency discovered");
        }
    }
    outcome
}

/// Templatizes every template, each against all the others.
///
/// Dependency names are captured before any document is rewritten.
pub fn templatize_all(templates: &mut [ItemTemplate]) -> Vec<TemplatizeOutcome> {
    let refs: Vec<DependencyRef> = templates.iter().map(DependencyRef::from_template).collect();
    templates
        .iter_mut()
        .map(|template| {
            let others: Vec<DependencyRef> = refs
                .iter()
                .filter(|r| r.key != template.key)
                .cloned()
                .collect();
            templatize(template, &others)
        })
        .collect()
}

fn templatize_service_layers(
    key: &str,
    document: &mut Value,
    deps: &[DependencyRef],
    found: &mut Discovered,
) -> Vec<LayerContext> {
    let mut contexts = Vec::new();
    let Some(properties) = document.get_mut("properties") else {
        return contexts;
    };
    for collection in LAYER_COLLECTIONS {
        let Some(Value::Array(layers)) = properties.get_mut(collection) else {
            continue;
        };
        for layer_def in layers {
            let Some(ctx) = LayerContext::from_layer(key, layer_def) else {
                tracing::trace!(key, collection, "layer without numeric id skipped");
                continue;
            };
            layer::templatize_layer(layer_def, &ctx, deps, found);
            contexts.push(ctx);
        }
    }
    contexts
}

fn templatize_data_layers(document: &mut Value, contexts: &[LayerContext]) {
    let Some(data) = document.get_mut("data") else {
        return;
    };
    for collection in LAYER_COLLECTIONS {
        let Some(Value::Array(layers)) = data.get_mut(collection) else {
            continue;
        };
        for data_layer in layers {
            let id = data_layer.get("id").and_then(Value::as_u64);
            match id.and_then(|id| contexts.iter().find(|c| c.layer_id == id)) {
                Some(ctx) => layer::templatize_data_layer(data_layer, ctx),
                None => tracing::trace!(collection, ?id, "data layer has no service counterpart"),
            }
        }
    }
}
