//! # solclone-template
//!
//! Templatization engine for content items.
//!
//! Handles:
//! - **Placeholder**: the `{{key.path}}` token grammar and its builders.
//! - **Field references**: rewriting raw field names in properties and
//!   free text (SQL-like, Arcade, label and popup notations).
//! - **Templatize**: visitors over the known document shapes that rewrite
//!   identifiers and field names and report discovered dependencies.
//! - **Resolve**: the inverse pass driven by a template dictionary.
//! - **Hierarchy**: the read-only dependency forest.
//! - **Graph**: dependency graph construction and topological ordering.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod field_ref;
pub mod graph;
pub mod hierarchy;
pub mod placeholder;
pub mod resolve;
pub mod templatize;

pub use graph::DependencyGraph;
pub use hierarchy::{HierarchyNode, build_hierarchy};
pub use resolve::{FieldSections, Resolver, resolve_fields};
pub use templatize::{TemplatizeOutcome, templatize, templatize_all, templatize_document};
