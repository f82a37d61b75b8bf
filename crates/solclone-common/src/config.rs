//! Deployment run configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{DEFAULT_MAX_CONCURRENCY, SOLUTION_EXTENT, SOLUTION_ITEM_EXTENT};
use crate::dictionary::TemplateDictionary;
use crate::error::{Result, SolutionError};

/// Root configuration for one deployment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeployConfig {
    /// Upper bound on simultaneously in-flight item creations.
    pub max_concurrency: usize,
    /// Whether created resources are removed when the run fails.
    pub cleanup_on_failure: bool,
    /// Deploy-time service extent substituted for `{{solutionExtent}}`.
    pub solution_extent: Option<Value>,
    /// Deploy-time item extent substituted for `{{solutionItemExtent}}`.
    pub solution_item_extent: Option<Value>,
    /// Name of the destination folder created for the run.
    pub folder_name: Option<String>,
    /// Title of the destination solution record created for the run.
    pub solution_title: Option<String>,
    /// Extra dictionary entries available to every template.
    pub seed: Map<String, Value>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            cleanup_on_failure: true,
            solution_extent: None,
            solution_item_extent: None,
            folder_name: None,
            solution_title: None,
            seed: Map::new(),
        }
    }
}

impl DeployConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading deploy configuration");
        let content = std::fs::read_to_string(path).map_err(|e| SolutionError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Effective concurrency; zero is treated as one.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    /// Builds the initial template dictionary for a run.
    #[must_use]
    pub fn initial_dictionary(&self) -> TemplateDictionary {
        let mut dict = TemplateDictionary::with_seed(self.seed.clone());
        if let Some(extent) = &self.solution_extent {
            dict.set(SOLUTION_EXTENT, extent.clone());
        }
        if let Some(extent) = &self.solution_item_extent {
            dict.set(SOLUTION_ITEM_EXTENT, extent.clone());
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let cfg: DeployConfig = serde_json::from_value(json!({"folderName": "Clone"})).unwrap();
        assert_eq!(cfg.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert!(cfg.cleanup_on_failure);
        assert_eq!(cfg.folder_name.as_deref(), Some("Clone"));
    }

    #[test]
    fn zero_concurrency_means_one() {
        let cfg = DeployConfig {
            max_concurrency: 0,
            ..DeployConfig::default()
        };
        assert_eq!(cfg.concurrency(), 1);
    }

    #[test]
    fn initial_dictionary_carries_seed_and_extents() {
        let mut seed = Map::new();
        let _ = seed.insert("org".into(), json!({"id": "o1"}));
        let cfg = DeployConfig {
            solution_extent: Some(json!({"xmin": 1})),
            seed,
            ..DeployConfig::default()
        };
        let dict = cfg.initial_dictionary();
        assert_eq!(dict.lookup("org.id"), Some(&json!("o1")));
        assert_eq!(dict.lookup("solutionExtent.xmin"), Some(&json!(1)));
        assert!(!dict.contains("solutionItemExtent"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = DeployConfig::load(Path::new("/nonexistent/solclone.json")).unwrap_err();
        assert!(matches!(err, SolutionError::Io { .. }));
    }
}
