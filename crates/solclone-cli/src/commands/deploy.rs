//! `solclone deploy`: Create every template of a set, dependencies first.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use solclone_common::config::DeployConfig;
use solclone_common::types::ItemTemplate;
use solclone_deploy::{
    CancellationFlag, Deployer, Destination, DeploymentReport, DryRunDestination, LogProgress,
    Outcome, ProgressCallback, ProgressEvent,
};

use crate::output::{read_templates, write_json};

/// Arguments for the `deploy` command.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Template set (JSON or YAML).
    pub templates: PathBuf,

    /// Create items in an in-memory destination instead of a real one.
    #[arg(long)]
    pub dry_run: bool,

    /// Deployment configuration file (JSON).
    #[arg(short, long, env = "SOLCLONE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the final template dictionary to this file.
    #[arg(long)]
    pub dictionary: Option<PathBuf>,
}

/// Executes the `deploy` command.
///
/// Ctrl+C stops the run cooperatively: nothing new is launched, in-flight
/// creations finish and everything created is rolled back.
///
/// # Errors
///
/// Returns an error if inputs cannot be read, no destination is available,
/// or the deployment fails.
pub fn execute(args: &DeployArgs) -> anyhow::Result<()> {
    if !args.dry_run {
        anyhow::bail!("no destination is configured; pass --dry-run to deploy in memory");
    }
    let templates = read_templates(&args.templates)?;
    let config = match &args.config {
        Some(path) => DeployConfig::load(path)?,
        None => DeployConfig::default(),
    };

    let flag = CancellationFlag::new();
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || handler_flag.cancel())
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(deploy(
        Arc::new(DryRunDestination::new()),
        config,
        templates,
        flag,
    ))?;

    print_report(&report);
    if let Some(path) = &args.dictionary {
        write_json(&report.dictionary, Some(path))?;
    }
    Ok(())
}

async fn deploy(
    destination: Arc<dyn Destination>,
    config: DeployConfig,
    templates: Vec<ItemTemplate>,
    flag: CancellationFlag,
) -> anyhow::Result<DeploymentReport> {
    let progress = move |event: &ProgressEvent| LogProgress.report(event) && flag.report(event);
    let report = Deployer::new(destination, config)
        .with_progress(progress)
        .deploy(templates)
        .await?;
    Ok(report)
}

fn print_report(report: &DeploymentReport) {
    match report.outcome {
        Outcome::Completed => {
            println!("Deployed {} item(s):", report.items.len());
            for item in &report.items {
                println!("  + {} -> {} [{}]", item.key, item.id, item.kind);
                if let Some(url) = &item.url {
                    println!("      url: {url}");
                }
                for group in &item.groups {
                    println!("      shared with: {group}");
                }
            }
        }
        Outcome::Cancelled => {
            println!("Deployment cancelled.");
            if !report.rolled_back.is_empty() {
                println!("  Rolled back: {}", report.rolled_back.join(", "));
            }
        }
    }
}
