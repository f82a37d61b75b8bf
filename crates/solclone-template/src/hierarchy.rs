//! Read-only dependency hierarchy for display and diagnostics.
//!
//! Shared dependencies are expanded under every parent; the result is a
//! forest of trees, not a DAG.

use serde::{Deserialize, Serialize};
use solclone_common::error::{Result, SolutionError};
use solclone_common::types::ItemTemplate;

/// One node of the dependency forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    /// Template key.
    pub id: String,
    /// Expanded dependencies, in dependency-list order.
    pub dependencies: Vec<HierarchyNode>,
}

/// Builds the dependency forest of `templates`.
///
/// Roots are the templates no other template depends on, in input order.
/// Dependencies without a matching template are omitted.
///
/// # Errors
///
/// Returns [`SolutionError::CyclicDependency`] with the offending path if
/// a template is reached again below itself.
pub fn build_hierarchy(templates: &[ItemTemplate]) -> Result<Vec<HierarchyNode>> {
    let mut path = Vec::new();
    templates
        .iter()
        .filter(|t| {
            !templates
                .iter()
                .any(|other| other.key != t.key && other.dependencies.contains(&t.key))
        })
        .map(|root| expand(root, templates, &mut path))
        .collect()
}

fn expand(
    template: &ItemTemplate,
    templates: &[ItemTemplate],
    path: &mut Vec<String>,
) -> Result<HierarchyNode> {
    if path.contains(&template.key) {
        let mut keys = path.clone();
        keys.push(template.key.clone());
        return Err(SolutionError::CyclicDependency { keys });
    }
    path.push(template.key.clone());
    let mut dependencies = Vec::with_capacity(template.dependencies.len());
    for dep in &template.dependencies {
        match templates.iter().find(|t| t.key == *dep) {
            Some(child) => dependencies.push(expand(child, templates, path)?),
            None => tracing::trace!(key = %template.key, dependency = %dep, "dependency not in set"),
        }
    }
    let _ = path.pop();
    Ok(HierarchyNode {
        id: template.key.clone(),
        dependencies,
    })
}

/// Renders a forest as an indented tree, one key per line.
#[must_use]
pub fn render_tree(forest: &[HierarchyNode]) -> String {
    fn walk(node: &HierarchyNode, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&node.id);
        out.push('\n');
        for child in &node.dependencies {
            walk(child, depth + 1, out);
        }
    }
    let mut out = String::new();
    for root in forest {
        walk(root, 0, &mut out);
    }
    out
}
