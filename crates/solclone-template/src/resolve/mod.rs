//! Detemplatizer: replaces placeholders with values from a
//! [`TemplateDictionary`].
//!
//! Two passes are offered. The generic pass ([`Resolver`]) leaves any token
//! it cannot resolve untouched so that partially resolvable documents still
//! deploy. The field-level pass ([`resolve_fields`]) turns a whole-value
//! field token that cannot be resolved into `null`.

mod fields;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use solclone_common::dictionary::TemplateDictionary;
use solclone_common::types::ItemTemplate;

use crate::placeholder::{Segment, parse_field_ref, segments, whole_placeholder_path};

pub use fields::{FieldMapping, name_mapping, post_process_fields};

/// Substitutes placeholders using one dictionary snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    dictionary: &'a TemplateDictionary,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over `dictionary`.
    #[must_use]
    pub const fn new(dictionary: &'a TemplateDictionary) -> Self {
        Self { dictionary }
    }

    /// Replaces every token whose path walks to a string, number or bool.
    #[must_use]
    pub fn resolve_text(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for segment in segments(text) {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Placeholder(path) => match self.scalar(path) {
                    Some(value) => out.push_str(&value),
                    None => {
                        tracing::debug!(path, "placeholder left unresolved");
                        out.push_str(&crate::placeholder::token(path));
                    }
                },
            }
        }
        out
    }

    /// Resolves a JSON tree in place, object keys included.
    ///
    /// A string that is exactly one token resolving to a non-string value
    /// (an extent object, a number) takes that value with its type.
    pub fn resolve_value(&self, value: &mut Value) {
        match value {
            Value::String(text) => {
                if let Some(typed) = self.typed(text) {
                    *value = typed;
                } else if text.contains("{{") {
                    *text = self.resolve_text(text);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.resolve_value(item);
                }
            }
            Value::Object(map) => {
                let entries = std::mem::take(map);
                *map = entries
                    .into_iter()
                    .map(|(key, mut item)| {
                        self.resolve_value(&mut item);
                        (self.resolve_text(&key), item)
                    })
                    .collect::<Map<String, Value>>();
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    /// Returns a copy of `template` with its document resolved.
    #[must_use]
    pub fn resolve_template(&self, template: &ItemTemplate) -> ItemTemplate {
        let mut resolved = template.clone();
        self.resolve_value(&mut resolved.document);
        resolved
    }

    /// Field tokens go through the layer's field table, so a field name
    /// that itself contains `.` still finds its entry.
    fn scalar(&self, path: &str) -> Option<String> {
        if let Some(field) = parse_field_ref(path) {
            if let Some(def) = self.dictionary.field(field.key, field.layer_id, &field.field) {
                return Some(def.name);
            }
        }
        match self.dictionary.lookup(path)? {
            Value::String(s) => Some(s.clone()),
            v @ (Value::Number(_) | Value::Bool(_)) => Some(v.to_string()),
            _ => None,
        }
    }

    fn typed(&self, text: &str) -> Option<Value> {
        let path = whole_placeholder_path(text)?;
        match self.dictionary.lookup(path)? {
            Value::String(_) | Value::Null => None,
            other => Some(other.clone()),
        }
    }
}

/// The field-bearing sections of a created service that are rewritten
/// after creation, keyed however the caller keys them (usually by layer id).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSections {
    /// Layer field infos (`sourceFields`, `newFields`, edit fields info).
    #[serde(default)]
    pub field_infos: Value,
    /// Popup configurations.
    #[serde(default)]
    pub popup_infos: Value,
    /// Admin layer infos of view layers.
    #[serde(default)]
    pub admin_layer_infos: Value,
}

/// Field-level inverse of the templatizer.
///
/// Field tokens resolve to the current (original-cased) field name. A
/// value that is exactly one field token with no dictionary entry becomes
/// `null`; tokens embedded in longer text stay intact when unresolved.
#[must_use]
pub fn resolve_fields(mut sections: FieldSections, dictionary: &TemplateDictionary) -> FieldSections {
    let resolver = Resolver::new(dictionary);
    for section in [
        &mut sections.field_infos,
        &mut sections.popup_infos,
        &mut sections.admin_layer_infos,
    ] {
        resolve_field_value(&resolver, section);
    }
    sections
}

fn resolve_field_value(resolver: &Resolver<'_>, value: &mut Value) {
    match value {
        Value::String(text) => {
            let unresolved_field = whole_placeholder_path(text)
                .filter(|path| parse_field_ref(path).is_some())
                .is_some_and(|path| resolver.scalar(path).is_none());
            if unresolved_field {
                tracing::debug!(token = %text, "field reference has no dictionary entry");
                *value = Value::Null;
            } else {
                resolver.resolve_value(value);
            }
        }
        Value::Array(items) => {
            for item in items {
                resolve_field_value(resolver, item);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                resolve_field_value(resolver, item);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
