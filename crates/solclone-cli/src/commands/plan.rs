//! `solclone plan`: Show the creation order of a template set.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use solclone_common::types::ItemTemplate;
use solclone_template::DependencyGraph;

use crate::output::read_templates;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Template set (JSON or YAML).
    pub templates: PathBuf,
}

/// Executes the `plan` command.
///
/// Builds the dependency graph, resolves a creation order and prints it
/// together with the edges between items.
///
/// # Errors
///
/// Returns an error if the set cannot be read or its dependencies form a cycle.
pub fn execute(args: &PlanArgs) -> anyhow::Result<()> {
    let templates = read_templates(&args.templates)?;
    let plan = plan(&templates)?;

    println!("Deployment plan for: {}", args.templates.display());
    println!();
    for key in &plan.order {
        if let Some(t) = templates.iter().find(|t| t.key == *key) {
            println!("  + {key}  [{}] {}", t.kind, t.display_name());
        }
        if let Some(needs) = plan.prerequisites.get(key).filter(|n| !n.is_empty()) {
            println!("      needs: {}", needs.join(", "));
        }
    }
    println!();
    println!("  {} item(s) will be created.", plan.order.len());

    if !plan.edges.is_empty() {
        println!();
        println!("  Dependencies:");
        for (dependent, dependency) in &plan.edges {
            println!("    {dependent} -> {dependency}");
        }
    }
    Ok(())
}

/// What `plan` prints for a template set.
#[derive(Debug)]
struct Plan {
    /// Creation order.
    order: Vec<String>,
    /// `(dependent, dependency)` pairs.
    edges: Vec<(String, String)>,
    /// Every item each key transitively needs, sorted.
    prerequisites: BTreeMap<String, Vec<String>>,
}

fn plan(templates: &[ItemTemplate]) -> anyhow::Result<Plan> {
    let graph = DependencyGraph::from_templates(templates);
    let order = graph.resolve_order()?;
    let prerequisites = order
        .iter()
        .map(|key| {
            let mut needs = graph.dependencies_of(key);
            needs.sort();
            (key.clone(), needs)
        })
        .collect();
    Ok(Plan {
        order,
        edges: graph.edges(),
        prerequisites,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn plan_puts_dependencies_first() {
        let templates = vec![
            ItemTemplate::new("app", "Web Mapping Application", json!({})).with_dependencies(["map"]),
            ItemTemplate::new("map", "Web Map", json!({})).with_dependencies(["svc"]),
            ItemTemplate::new("svc", "Feature Service", json!({})),
        ];
        let Plan {
            order,
            edges,
            prerequisites,
        } = plan(&templates).unwrap();
        let pos = |k: &str| order.iter().position(|o| o == k).unwrap();
        assert!(pos("svc") < pos("map"));
        assert!(pos("map") < pos("app"));
        assert_eq!(
            edges,
            vec![
                ("app".to_owned(), "map".to_owned()),
                ("map".to_owned(), "svc".to_owned()),
            ]
        );
        assert_eq!(prerequisites["app"], vec!["map", "svc"]);
        assert!(prerequisites["svc"].is_empty());
    }

    #[test]
    fn plan_rejects_cycles() {
        let templates = vec![
            ItemTemplate::new("a", "Web Map", json!({})).with_dependencies(["b"]),
            ItemTemplate::new("b", "Web Map", json!({})).with_dependencies(["a"]),
        ];
        assert!(plan(&templates).is_err());
    }
}
