//! Reading template sets and writing command results.
//!
//! Template sets are JSON or YAML arrays of item templates; the format is
//! chosen by file extension. Results are always written as pretty JSON.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use solclone_common::types::ItemTemplate;

/// Reads a template set from a `.json`, `.yaml` or `.yml` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold a list
/// of templates.
pub fn read_templates(path: &Path) -> anyhow::Result<Vec<ItemTemplate>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read template set {}", path.display()))?;
    let templates = if is_yaml(path) {
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML template set {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON template set {}", path.display()))?
    };
    Ok(templates)
}

/// Writes `value` as pretty JSON to `path`, or to stdout when `None`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: Option<&Path>) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => std::fs::write(path, rendered + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_json_and_yaml_sets() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("set.json");
        std::fs::write(
            &json_path,
            r#"[{"key": "a", "kind": "Web Map", "dependencies": ["b"]}, {"key": "b", "kind": "Feature Service"}]"#,
        )
        .unwrap();
        let yaml_path = dir.path().join("set.YML");
        std::fs::write(
            &yaml_path,
            "- key: a\n  kind: Web Map\n  dependencies: [b]\n- key: b\n  kind: Feature Service\n",
        )
        .unwrap();

        let from_json = read_templates(&json_path).unwrap();
        let from_yaml = read_templates(&yaml_path).unwrap();
        assert_eq!(from_json, from_yaml);
        assert_eq!(from_json[0].dependencies, vec!["b"]);
        assert!((from_json[1].cost_factor - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_set_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = read_templates(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn missing_set_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_templates(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn writes_pretty_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&json!({"a": [1, 2]}), Some(&path)).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"a": [1, 2]}));
    }
}
