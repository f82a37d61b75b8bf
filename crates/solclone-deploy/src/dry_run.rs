//! In-memory destination for dry runs and tests.
//!
//! Creates nothing: every call is recorded and answered with fresh ids.
//! Layers echo the template's own layer ids and field lists.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use solclone_common::config::DeployConfig;
use solclone_common::constants::APP_NAME;
use solclone_common::dictionary::TemplateDictionary;
use solclone_common::error::{Result, SolutionError};
use solclone_common::types::{FieldDef, ItemTemplate, LayerFieldInfo};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::destination::{ContainerResource, CreatedItem, CreatedLayer, Destination};

const DRY_RUN_HOST: &str = "https://dry-run.invalid";

/// A call received by the dry-run destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationCall {
    /// `prepare`
    Prepare,
    /// `create_item` for a template key, with the id handed out.
    Create {
        /// Template key.
        key: String,
        /// New id, empty when creation was rejected.
        id: String,
    },
    /// `post_process` of an item.
    PostProcess {
        /// Item id.
        id: String,
    },
    /// `remove_item`
    Remove {
        /// Item id.
        id: String,
    },
    /// `add_to_group`
    AddToGroup {
        /// Item id.
        id: String,
        /// Group id.
        group_id: String,
    },
    /// `remove_container`
    RemoveContainer {
        /// Container id.
        id: String,
    },
}

/// Destination that records calls instead of creating items.
#[derive(Debug, Default)]
pub struct DryRunDestination {
    calls: Mutex<Vec<DestinationCall>>,
    received: Mutex<Vec<ItemTemplate>>,
    fail_keys: BTreeSet<String>,
    post_process_keys: BTreeSet<String>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl DryRunDestination {
    /// Creates a destination that accepts every item immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the creation of `key`.
    #[must_use]
    pub fn failing_on(mut self, key: impl Into<String>) -> Self {
        let _ = self.fail_keys.insert(key.into());
        self
    }

    /// Flags `key` as needing post-processing once created.
    #[must_use]
    pub fn post_processing(mut self, key: impl Into<String>) -> Self {
        let _ = self.post_process_keys.insert(key.into());
        self
    }

    /// Makes every creation take `delay`.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<DestinationCall> {
        self.calls.lock().await.clone()
    }

    /// Template keys whose creation was accepted, in order.
    pub async fn created_keys(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                DestinationCall::Create { key, id } if !id.is_empty() => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// The resolved template handed over for `key`, if any.
    pub async fn received(&self, key: &str) -> Option<ItemTemplate> {
        self.received.lock().await.iter().find(|t| t.key == key).cloned()
    }

    /// Highest number of creations that were running at the same time.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn record(&self, call: DestinationCall) {
        self.calls.lock().await.push(call);
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn kind_slug(kind: &str) -> String {
    kind.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Echoes the layers and tables described by a template document.
fn echo_layers(document: &Value, base_url: &str) -> Vec<CreatedLayer> {
    let Some(properties) = document.get("properties") else {
        return Vec::new();
    };
    ["layers", "tables"]
        .iter()
        .filter_map(|collection| properties.get(*collection).and_then(Value::as_array))
        .flatten()
        .filter_map(|layer| {
            let id = layer.get("id").and_then(Value::as_u64)?;
            let fields: Vec<FieldDef> = layer
                .get("fields")
                .cloned()
                .and_then(|f| serde_json::from_value(f).ok())
                .unwrap_or_default();
            Some(CreatedLayer {
                id,
                url: format!("{base_url}/{id}"),
                field_info: Some(LayerFieldInfo {
                    layer_id: id,
                    source_fields: fields.clone(),
                    new_fields: fields,
                    ..LayerFieldInfo::default()
                }),
            })
        })
        .collect()
}

#[async_trait]
impl Destination for DryRunDestination {
    async fn prepare(&self, config: &DeployConfig) -> Result<Vec<ContainerResource>> {
        self.record(DestinationCall::Prepare).await;
        let folder = ContainerResource {
            kind: "folder".into(),
            id: new_id(),
            name: config.folder_name.clone().unwrap_or_else(|| APP_NAME.to_owned()),
        };
        let solution = ContainerResource {
            kind: "solution".into(),
            id: new_id(),
            name: config.solution_title.clone().unwrap_or_else(|| APP_NAME.to_owned()),
        };
        tracing::debug!(folder = %folder.id, solution = %solution.id, "dry-run containers prepared");
        Ok(vec![folder, solution])
    }

    async fn create_item(
        &self,
        template: &ItemTemplate,
        dictionary: &TemplateDictionary,
    ) -> Result<CreatedItem> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let _ = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.received.lock().await.push(template.clone());

        if self.fail_keys.contains(&template.key) {
            self.record(DestinationCall::Create {
                key: template.key.clone(),
                id: String::new(),
            })
            .await;
            return Err(SolutionError::collaborator(format!(
                "dry run rejected {}",
                template.key
            )));
        }

        let id = new_id();
        let url = format!("{DRY_RUN_HOST}/{}/{id}", kind_slug(&template.kind));
        let name = template
            .document
            .pointer("/item/name")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        let layers = echo_layers(&template.document, &url);
        tracing::debug!(
            key = %template.key,
            id = %id,
            known_entries = dictionary.len(),
            "dry-run item created"
        );
        self.record(DestinationCall::Create {
            key: template.key.clone(),
            id: id.clone(),
        })
        .await;
        Ok(CreatedItem {
            url: (!layers.is_empty() || name.is_some()).then_some(url),
            name,
            kind: template.kind.clone(),
            layers,
            post_process_needed: self.post_process_keys.contains(&template.key),
            id,
        })
    }

    async fn post_process(
        &self,
        item: &CreatedItem,
        _template: &ItemTemplate,
        _dictionary: &TemplateDictionary,
    ) -> Result<()> {
        self.record(DestinationCall::PostProcess { id: item.id.clone() }).await;
        Ok(())
    }

    async fn remove_item(&self, item: &CreatedItem) -> Result<()> {
        self.record(DestinationCall::Remove { id: item.id.clone() }).await;
        Ok(())
    }

    async fn add_to_group(&self, item: &CreatedItem, group_id: &str) -> Result<()> {
        self.record(DestinationCall::AddToGroup {
            id: item.id.clone(),
            group_id: group_id.to_owned(),
        })
        .await;
        Ok(())
    }

    async fn remove_container(&self, container: &ContainerResource) -> Result<()> {
        self.record(DestinationCall::RemoveContainer {
            id: container.id.clone(),
        })
        .await;
        Ok(())
    }
}
