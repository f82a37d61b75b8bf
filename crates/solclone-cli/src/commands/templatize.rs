//! `solclone templatize`: Replace environment-specific references with placeholders.

use std::path::PathBuf;

use clap::Args;
use solclone_template::templatize_all;

use crate::output::{read_templates, write_json};

/// Arguments for the `templatize` command.
#[derive(Args, Debug)]
pub struct TemplatizeArgs {
    /// Template set holding the captured items (JSON or YAML).
    pub items: PathBuf,

    /// Where to write the templatized set; stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Executes the `templatize` command.
///
/// Every item is templatized against all others, so references between
/// items of the set become placeholders and dependencies.
///
/// # Errors
///
/// Returns an error if the set cannot be read or the result cannot be written.
pub fn execute(args: &TemplatizeArgs) -> anyhow::Result<()> {
    let mut templates = read_templates(&args.items)?;
    let outcomes = templatize_all(&mut templates);
    for (template, outcome) in templates.iter().zip(&outcomes) {
        tracing::info!(
            key = %template.key,
            kind = %template.kind,
            discovered = outcome.dependencies.len(),
            "item templatized"
        );
    }
    write_json(&templates, args.output.as_deref())
}
