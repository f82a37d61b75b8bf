//! Outcome of a deployment run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use solclone_common::dictionary::TemplateDictionary;
use solclone_common::types::ItemStatus;

/// An item created by the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedItem {
    /// Template key.
    pub key: String,
    /// New item id.
    pub id: String,
    /// New item url, if any.
    pub url: Option<String>,
    /// Item type tag.
    pub kind: String,
    /// New ids of the groups the item was shared with.
    pub groups: Vec<String>,
    /// When creation completed.
    pub created_at: DateTime<Utc>,
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Every template was created.
    Completed,
    /// The progress callback stopped the run; created items were rolled back.
    Cancelled,
}

/// Result of [`crate::Deployer::deploy`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentReport {
    /// How the run ended.
    pub outcome: Outcome,
    /// Items that exist at the destination, in creation order.
    pub items: Vec<DeployedItem>,
    /// Keys whose items were created and then removed.
    pub rolled_back: Vec<String>,
    /// Final status of every template.
    pub statuses: BTreeMap<String, ItemStatus>,
    /// The run's template dictionary.
    pub dictionary: TemplateDictionary,
}

impl DeploymentReport {
    /// Returns the deployed item created for `key`.
    #[must_use]
    pub fn item(&self, key: &str) -> Option<&DeployedItem> {
        self.items.iter().find(|i| i.key == key)
    }

    /// Returns the final status of `key`.
    #[must_use]
    pub fn status(&self, key: &str) -> Option<ItemStatus> {
        self.statuses.get(key).copied()
    }
}
