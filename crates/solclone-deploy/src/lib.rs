//! Deployment of templatized items for solclone.
//!
//! The [`scheduler::Deployer`] orders templates by dependency, resolves
//! each one against the run's template dictionary, hands it to a
//! [`destination::Destination`] and records what was created.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod destination;
pub mod dry_run;
pub mod progress;
pub mod scheduler;
pub mod state;

pub use destination::{ContainerResource, CreatedItem, CreatedLayer, Destination};
pub use dry_run::DryRunDestination;
pub use progress::{CancellationFlag, LogProgress, ProgressCallback, ProgressEvent};
pub use scheduler::Deployer;
pub use state::{DeployedItem, DeploymentReport, Outcome};
