//! Destination abstraction: the collaborator that creates items.
//!
//! The scheduler owns ordering, resolution and cleanup; a destination only
//! performs the side effects and reports the new identities.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solclone_common::config::DeployConfig;
use solclone_common::dictionary::{ResolvedItem, ResolvedLayer, TemplateDictionary};
use solclone_common::error::Result;
use solclone_common::types::{ItemTemplate, LayerFieldInfo};
use solclone_template::resolve::post_process_fields;

/// A top-level resource created for the run (folder, solution record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResource {
    /// Resource kind, e.g. `folder`.
    pub kind: String,
    /// Identifier at the destination.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// One layer of a created service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLayer {
    /// Layer id within the service.
    pub id: u64,
    /// New layer url.
    pub url: String,
    /// Source and new schema, when the destination reports them.
    pub field_info: Option<LayerFieldInfo>,
}

/// What a destination returns for a created item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedItem {
    /// New item id.
    pub id: String,
    /// New item url, for service-like items.
    pub url: Option<String>,
    /// New item name, for service-like items.
    pub name: Option<String>,
    /// Item type tag.
    pub kind: String,
    /// Layers and tables of a created service.
    #[serde(default)]
    pub layers: Vec<CreatedLayer>,
    /// Whether the item must be revisited once every item exists.
    #[serde(default)]
    pub post_process_needed: bool,
}

impl CreatedItem {
    /// Creates a result carrying only an id and kind.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
            name: None,
            kind: kind.into(),
            layers: Vec::new(),
            post_process_needed: false,
        }
    }

    /// Converts the result into the dictionary record written for its key.
    ///
    /// Layer field mappings are derived from the reported schemas; a layer
    /// without schema data gets an empty mapping.
    #[must_use]
    pub fn to_record(&self) -> ResolvedItem {
        let infos: Vec<LayerFieldInfo> = self
            .layers
            .iter()
            .filter_map(|l| l.field_info.clone())
            .collect();
        let mut mappings = post_process_fields(&infos);
        ResolvedItem {
            item_id: self.id.clone(),
            url: self.url.clone(),
            name: self.name.clone(),
            layers: self
                .layers
                .iter()
                .map(|layer| ResolvedLayer {
                    item_id: self.id.clone(),
                    url: layer.url.clone(),
                    layer_id: layer.id,
                    fields: mappings.remove(&layer.id).unwrap_or_default(),
                })
                .collect(),
        }
    }
}

/// The creation collaborator.
///
/// Implementors handle the destination-specific details of creating,
/// sharing and removing items.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Creates the top-level resources of a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the resources cannot be created.
    async fn prepare(&self, config: &DeployConfig) -> Result<Vec<ContainerResource>>;

    /// Creates one item from a template whose placeholders are resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination rejects the item.
    async fn create_item(
        &self,
        template: &ItemTemplate,
        dictionary: &TemplateDictionary,
    ) -> Result<CreatedItem>;

    /// Revisits an item once every item of the run exists.
    ///
    /// `template` is resolved against the final dictionary. The default
    /// does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be updated.
    async fn post_process(
        &self,
        item: &CreatedItem,
        template: &ItemTemplate,
        dictionary: &TemplateDictionary,
    ) -> Result<()> {
        let _ = (item, template, dictionary);
        Ok(())
    }

    /// Removes a created item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be removed.
    async fn remove_item(&self, item: &CreatedItem) -> Result<()>;

    /// Shares a created item with a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be shared.
    async fn add_to_group(&self, item: &CreatedItem, group_id: &str) -> Result<()>;

    /// Removes a top-level resource created by [`Destination::prepare`].
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be removed.
    async fn remove_container(&self, container: &ContainerResource) -> Result<()>;
}
