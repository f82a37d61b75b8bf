//! `solclone hierarchy`: Print the dependency tree of a template set.

use std::path::PathBuf;

use clap::Args;
use solclone_template::build_hierarchy;
use solclone_template::hierarchy::render_tree;

use crate::output::{read_templates, write_json};

/// Arguments for the `hierarchy` command.
#[derive(Args, Debug)]
pub struct HierarchyArgs {
    /// Template set (JSON or YAML).
    pub templates: PathBuf,

    /// Print the forest as JSON instead of an indented tree.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `hierarchy` command.
///
/// # Errors
///
/// Returns an error if the set cannot be read or its dependencies form a cycle.
pub fn execute(args: &HierarchyArgs) -> anyhow::Result<()> {
    let templates = read_templates(&args.templates)?;
    let forest = build_hierarchy(&templates)?;
    if args.json {
        return write_json(&forest, None);
    }
    print!("{}", render_tree(&forest));
    Ok(())
}
