//! CLI command definitions and dispatch.

pub mod deploy;
pub mod hierarchy;
pub mod plan;
pub mod templatize;

use clap::{Parser, Subcommand, ValueEnum};

/// solclone: clone sets of interdependent content items.
#[derive(Parser, Debug)]
#[command(name = "solclone", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Format of log lines written to stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log line format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace environment-specific references in a set of items with placeholders.
    Templatize(templatize::TemplatizeArgs),
    /// Print the dependency tree of a template set.
    Hierarchy(hierarchy::HierarchyArgs),
    /// Show the creation order of a template set.
    Plan(plan::PlanArgs),
    /// Create every template of a set, dependencies first.
    Deploy(deploy::DeployArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Templatize(args) => templatize::execute(&args),
        Command::Hierarchy(args) => hierarchy::execute(&args),
        Command::Plan(args) => plan::execute(&args),
        Command::Deploy(args) => deploy::execute(&args),
    }
}
