//! Run-scoped template dictionary.
//!
//! Maps a symbolic template key to the concrete identity of the item that
//! was created for it. Entries are written as whole records once creation
//! succeeds and are read by the resolver for every later item.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{FIELDS, ITEM_ID, LAYER_ID, LAYER_PREFIX, NAME, PATH_SEPARATOR, URL};
use crate::types::FieldDef;

/// Resolved facts about one layer of a created item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLayer {
    /// New id of the owning item.
    pub item_id: String,
    /// New url of the layer.
    pub url: String,
    /// Layer id within the service.
    pub layer_id: u64,
    /// Lower-cased original field name to the field as it now exists.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDef>,
}

/// Resolved facts about one created item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedItem {
    /// New item id.
    pub item_id: String,
    /// New item url, for service-like items.
    pub url: Option<String>,
    /// New item name, for service-like items.
    pub name: Option<String>,
    /// Per-layer facts.
    pub layers: Vec<ResolvedLayer>,
}

impl ResolvedItem {
    /// Creates a record carrying only the new id.
    #[must_use]
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            ..Self::default()
        }
    }

    /// Serializes to the dictionary record shape:
    /// `{ itemId, url?, name?, layer<N>: { itemId, url, layerId, fields } }`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut record = Map::new();
        let _ = record.insert(ITEM_ID.into(), Value::String(self.item_id.clone()));
        if let Some(url) = &self.url {
            let _ = record.insert(URL.into(), Value::String(url.clone()));
        }
        if let Some(name) = &self.name {
            let _ = record.insert(NAME.into(), Value::String(name.clone()));
        }
        for layer in &self.layers {
            let mut fields = Map::new();
            for (lower, def) in &layer.fields {
                let _ = fields.insert(lower.clone(), field_value(def));
            }
            let mut entry = Map::new();
            let _ = entry.insert(ITEM_ID.into(), Value::String(layer.item_id.clone()));
            let _ = entry.insert(URL.into(), Value::String(layer.url.clone()));
            let _ = entry.insert(LAYER_ID.into(), Value::from(layer.layer_id));
            let _ = entry.insert(FIELDS.into(), Value::Object(fields));
            let _ = record.insert(format!("{LAYER_PREFIX}{}", layer.layer_id), Value::Object(entry));
        }
        Value::Object(record)
    }
}

fn field_value(def: &FieldDef) -> Value {
    let mut m = Map::new();
    let _ = m.insert(NAME.into(), Value::String(def.name.clone()));
    let _ = m.insert("alias".into(), Value::String(def.alias.clone()));
    let _ = m.insert("type".into(), Value::String(def.field_type.clone()));
    Value::Object(m)
}

/// Mapping from symbolic key to resolved record.
///
/// Created empty (or from a seed) at the start of a run and discarded at
/// its end; never a process-wide singleton.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateDictionary {
    entries: Map<String, Value>,
}

impl TemplateDictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dictionary pre-populated with run facts.
    #[must_use]
    pub const fn with_seed(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Writes the record for `key`, replacing any previous one as a whole.
    pub fn insert_record(&mut self, key: impl Into<String>, record: &ResolvedItem) {
        let key = key.into();
        tracing::debug!(key = %key, item_id = %record.item_id, "dictionary record written");
        let _ = self.entries.insert(key, record.to_value());
    }

    /// Sets an arbitrary top-level entry.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let _ = self.entries.insert(key.into(), value);
    }

    /// Removes the entry for `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Whether an entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the raw record for `key`.
    #[must_use]
    pub fn record(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the new item id recorded for `key`.
    #[must_use]
    pub fn item_id(&self, key: &str) -> Option<&str> {
        self.record(key)?.get(ITEM_ID)?.as_str()
    }

    /// Walks a dotted path from the root (`abc.layer0.fields.f.name`).
    ///
    /// Segments are consumed left to right, so a field literally called
    /// `name` is reached before the trailing `name` property.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(PATH_SEPARATOR);
        let mut current = self.entries.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Returns the current definition of a source field on a created layer.
    #[must_use]
    pub fn field(&self, key: &str, layer_id: u64, lower_name: &str) -> Option<FieldDef> {
        let def = self
            .record(key)?
            .get(format!("{LAYER_PREFIX}{layer_id}"))?
            .get(FIELDS)?
            .get(lower_name)?;
        serde_json::from_value(def.clone()).ok()
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
