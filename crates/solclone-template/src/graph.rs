//! Dependency graph management using `petgraph`.
//!
//! Builds a directed graph from template dependency lists and resolves a
//! creation order in which every dependency precedes its dependents.

use std::collections::BTreeMap;

use petgraph::Direction;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use solclone_common::error::{Result, SolutionError};
use solclone_common::types::ItemTemplate;

/// A dependency graph of templates.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Internal petgraph representation.
    graph: Graph<String, ()>,
    /// Template key to node.
    nodes: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            nodes: BTreeMap::new(),
        }
    }

    /// Builds the graph of a set of templates.
    ///
    /// Dependencies naming keys outside the set are not edges. A group
    /// does not wait for its own members: membership is bound after both
    /// exist, so a group's dependency on one of its members is dropped.
    #[must_use]
    pub fn from_templates(templates: &[ItemTemplate]) -> Self {
        let mut graph = Self::new();
        for template in templates {
            let _ = graph.add_template(&template.key);
        }
        for template in templates {
            for dep in &template.dependencies {
                if template.is_group() && is_member_of(templates, dep, &template.key) {
                    tracing::trace!(group = %template.key, member = %dep, "member edge skipped");
                    continue;
                }
                graph.add_dependency(&template.key, dep);
            }
        }
        graph
    }

    /// Adds a template node, returning the existing one for a known key.
    pub fn add_template(&mut self, key: impl Into<String>) -> NodeIndex {
        let key = key.into();
        if let Some(idx) = self.nodes.get(&key) {
            return *idx;
        }
        let idx = self.graph.add_node(key.clone());
        let _ = self.nodes.insert(key, idx);
        idx
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent` so that
    /// topological sort yields dependencies first. Unknown keys and self
    /// references are ignored.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) {
        let (Some(&to), Some(&from)) = (self.nodes.get(dependent), self.nodes.get(dependency)) else {
            return;
        };
        if from != to && self.graph.find_edge(from, to).is_none() {
            let _ = self.graph.add_edge(from, to, ());
        }
    }

    /// Returns a creation order: dependencies before their dependents.
    ///
    /// # Errors
    ///
    /// Returns [`SolutionError::CyclicDependency`] naming the keys of one
    /// cycle if the graph is not acyclic.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(SolutionError::CyclicDependency {
                keys: self.cycle_through(cycle.node_id()),
            }),
        }
    }

    /// Keys of every template `key` transitively depends on.
    #[must_use]
    pub fn dependencies_of(&self, key: &str) -> Vec<String> {
        self.nodes.get(key).map_or_else(Vec::new, |&start| {
            let reversed = Reversed(&self.graph);
            let mut dfs = Dfs::new(reversed, start);
            let mut out = Vec::new();
            while let Some(idx) = dfs.next(reversed) {
                if idx != start {
                    out.push(self.graph[idx].clone());
                }
            }
            out
        })
    }

    /// Keys of every template that transitively depends on `key`.
    #[must_use]
    pub fn dependents_of(&self, key: &str) -> Vec<String> {
        self.nodes.get(key).map_or_else(Vec::new, |&start| {
            let mut dfs = Dfs::new(&self.graph, start);
            let mut out = Vec::new();
            while let Some(idx) = dfs.next(&self.graph) {
                if idx != start {
                    out.push(self.graph[idx].clone());
                }
            }
            out
        })
    }

    /// Direct dependencies of `key` inside the graph.
    #[must_use]
    pub fn direct_dependencies(&self, key: &str) -> Vec<String> {
        self.nodes.get(key).map_or_else(Vec::new, |&idx| {
            let mut deps: Vec<String> = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|n| self.graph[n].clone())
                .collect();
            deps.sort();
            deps
        })
    }

    /// Every `(dependent, dependency)` pair, sorted.
    #[must_use]
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<(String, String)> = self
            .graph
            .raw_edges()
            .iter()
            .map(|e| (self.graph[e.target()].clone(), self.graph[e.source()].clone()))
            .collect();
        edges.sort();
        edges
    }

    /// Number of templates in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no templates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// The strongly connected component holding `node`, in key order.
    fn cycle_through(&self, node: NodeIndex) -> Vec<String> {
        let mut keys: Vec<String> = petgraph::algo::kosaraju_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&node))
            .unwrap_or_else(|| vec![node])
            .into_iter()
            .map(|idx| self.graph[idx].clone())
            .collect();
        keys.sort();
        keys
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn is_member_of(templates: &[ItemTemplate], member: &str, group: &str) -> bool {
    templates
        .iter()
        .any(|t| t.key == member && t.group_memberships.iter().any(|g| g == group))
}
