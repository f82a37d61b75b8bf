//! Domain primitive types used across the solclone workspace.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::GROUP_KIND;

/// A templatized, ready-to-replay description of one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    /// Symbolic identifier used as the placeholder namespace root.
    pub key: String,
    /// Item type tag; selects the creation recipe at the destination.
    pub kind: String,
    /// Nested payload, possibly containing placeholders.
    #[serde(default)]
    pub document: Value,
    /// Keys of templates that must be resolved before this one.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Keys of groups this item is shared with once both exist.
    #[serde(default)]
    pub group_memberships: Vec<String>,
    /// Relative weight used for progress reporting only.
    #[serde(default = "default_cost_factor")]
    pub cost_factor: f64,
}

const fn default_cost_factor() -> f64 {
    1.0
}

impl ItemTemplate {
    /// Creates a template with no dependencies and unit cost.
    #[must_use]
    pub fn new(key: impl Into<String>, kind: impl Into<String>, document: Value) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            document,
            dependencies: Vec::new(),
            group_memberships: Vec::new(),
            cost_factor: default_cost_factor(),
        }
    }

    /// Sets the dependency list, dropping duplicates.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dep in deps {
            let _ = self.add_dependency(dep);
        }
        self
    }

    /// Sets the group membership list.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_memberships = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a dependency unless it is already present or names this item.
    ///
    /// Returns `true` if the list changed.
    pub fn add_dependency(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if key.is_empty() || key == self.key || self.dependencies.contains(&key) {
            return false;
        }
        self.dependencies.push(key);
        true
    }

    /// Whether this template describes a group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.kind == GROUP_KIND
    }

    /// Human readable name: `item.name`, then `item.title`, then the key.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let item = self.document.get("item");
        item.and_then(|i| i.get("name"))
            .and_then(Value::as_str)
            .or_else(|| item.and_then(|i| i.get("title")).and_then(Value::as_str))
            .unwrap_or(&self.key)
    }
}

/// Another item that a template may reference, as known at export time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    /// Template key (the source item id).
    pub key: String,
    /// Service name of the item, matched against admin-layer source names.
    pub name: Option<String>,
}

impl DependencyRef {
    /// Creates a reference from a key and optional service name.
    #[must_use]
    pub fn new(key: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            key: key.into(),
            name: name.map(ToOwned::to_owned),
        }
    }

    /// Builds a reference from an existing template.
    #[must_use]
    pub fn from_template(template: &ItemTemplate) -> Self {
        let name = template
            .document
            .get("item")
            .and_then(|i| i.get("name"))
            .and_then(Value::as_str);
        Self::new(template.key.clone(), name)
    }
}

/// Name, alias and type of one field in a layer schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Physical field name.
    pub name: String,
    /// Display alias.
    #[serde(default)]
    pub alias: String,
    /// Field type tag (`esriFieldTypeString`, ...).
    #[serde(rename = "type", default)]
    pub field_type: String,
}

impl FieldDef {
    /// Creates a field definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        alias: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            field_type: field_type.into(),
        }
    }
}

/// Names of the system-maintained edit tracking fields of a layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditFieldsInfo {
    /// Field holding the creation date.
    pub creation_date_field: Option<String>,
    /// Field holding the creator.
    pub creator_field: Option<String>,
    /// Field holding the last edit date.
    pub edit_date_field: Option<String>,
    /// Field holding the last editor.
    pub editor_field: Option<String>,
}

impl EditFieldsInfo {
    /// Returns `(role, field)` pairs in a fixed order.
    #[must_use]
    pub fn roles(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("creationDateField", self.creation_date_field.as_deref()),
            ("creatorField", self.creator_field.as_deref()),
            ("editDateField", self.edit_date_field.as_deref()),
            ("editorField", self.editor_field.as_deref()),
        ]
    }

    /// Returns the field playing `role`, if any.
    #[must_use]
    pub fn field_for(&self, role: &str) -> Option<&str> {
        self.roles()
            .into_iter()
            .find(|(r, _)| *r == role)
            .and_then(|(_, f)| f)
    }
}

/// Source and destination schema of one layer, as reported after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerFieldInfo {
    /// Layer id within its service.
    pub layer_id: u64,
    /// Fields as exported from the source layer.
    #[serde(default)]
    pub source_fields: Vec<FieldDef>,
    /// Fields as they exist on the newly created layer.
    #[serde(default)]
    pub new_fields: Vec<FieldDef>,
    /// Edit tracking fields of the source layer.
    #[serde(default)]
    pub edit_fields_info: Option<EditFieldsInfo>,
    /// Edit tracking fields of the new layer.
    #[serde(default)]
    pub new_edit_fields_info: Option<EditFieldsInfo>,
    /// Whether the destination accepts schema changes.
    #[serde(default = "default_true")]
    pub source_schema_changes_allowed: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for LayerFieldInfo {
    fn default() -> Self {
        Self {
            layer_id: 0,
            source_fields: Vec::new(),
            new_fields: Vec::new(),
            edit_fields_info: None,
            new_edit_fields_info: None,
            source_schema_changes_allowed: true,
        }
    }
}

/// Lifecycle state of one item during a deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Waiting for at least one dependency.
    Pending,
    /// Every dependency is resolved; eligible for creation.
    Ready,
    /// The creation collaborator has been invoked.
    Creating,
    /// Created and recorded in the template dictionary.
    Created,
    /// The creation collaborator reported an error.
    Failed,
    /// Stopped by the progress callback.
    Cancelled,
}

impl ItemStatus {
    /// Whether no further transition can happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Created | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Creating => write!(f, "creating"),
            Self::Created => write!(f, "created"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
