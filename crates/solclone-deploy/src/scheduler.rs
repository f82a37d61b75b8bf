//! Dependency-ordered deployment.
//!
//! A single loop owns all run state: it launches every ready template (up
//! to the concurrency limit), waits for the next creation to finish,
//! writes the new item's dictionary record in one step and repeats. Each
//! creation works on its own dictionary snapshot, so no reader ever sees a
//! partially written record.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use solclone_common::config::DeployConfig;
use solclone_common::dictionary::TemplateDictionary;
use solclone_common::error::{Result, SolutionError};
use solclone_common::types::{ItemStatus, ItemTemplate};
use solclone_template::{DependencyGraph, Resolver};

use crate::destination::{ContainerResource, CreatedItem, Destination};
use crate::progress::{LogProgress, ProgressCallback, ProgressEvent};
use crate::state::{DeployedItem, DeploymentReport, Outcome};

type Creation = BoxFuture<'static, (String, Result<CreatedItem>)>;

/// Why the run stopped launching new creations.
#[derive(Debug)]
enum Stop {
    Cancelled,
    Failed { key: String, message: String },
}

#[derive(Debug)]
struct Created {
    key: String,
    item: CreatedItem,
    at: DateTime<Utc>,
}

/// Mutable state of one run, owned by the scheduling loop.
struct Run {
    /// Templates in creation order.
    templates: Vec<ItemTemplate>,
    /// In-run dependencies of each template.
    waiting_on: BTreeMap<String, Vec<String>>,
    /// Templates that transitively depend on each template.
    dependents: BTreeMap<String, Vec<String>>,
    statuses: BTreeMap<String, ItemStatus>,
    dictionary: TemplateDictionary,
    created: Vec<Created>,
    rolled_back: Vec<String>,
    groups: BTreeMap<String, Vec<String>>,
    total_cost: f64,
    done_cost: f64,
    stop: Option<Stop>,
}

impl Run {
    fn new(mut templates: Vec<ItemTemplate>, order: &[String], graph: &DependencyGraph, dictionary: TemplateDictionary) -> Self {
        templates.sort_by_key(|t| order.iter().position(|k| *k == t.key));
        let mut waiting_on = BTreeMap::new();
        let mut dependents = BTreeMap::new();
        for template in &templates {
            for dep in &template.dependencies {
                if templates.iter().any(|t| t.key == *dep) {
                    continue;
                }
                if dictionary.contains(dep) {
                    tracing::debug!(key = %template.key, dependency = %dep, "dependency resolved by seed");
                } else {
                    tracing::warn!(key = %template.key, dependency = %dep, "dependency outside the run ignored");
                }
            }
            let _ = waiting_on.insert(template.key.clone(), graph.direct_dependencies(&template.key));
            let _ = dependents.insert(template.key.clone(), graph.dependents_of(&template.key));
        }
        let statuses = templates
            .iter()
            .map(|t| (t.key.clone(), ItemStatus::Pending))
            .collect();
        let total_cost = templates.iter().map(|t| t.cost_factor.max(0.0)).sum();
        Self {
            templates,
            waiting_on,
            dependents,
            statuses,
            dictionary,
            created: Vec::new(),
            rolled_back: Vec::new(),
            groups: BTreeMap::new(),
            total_cost,
            done_cost: 0.0,
            stop: None,
        }
    }

    fn template(&self, key: &str) -> Option<&ItemTemplate> {
        self.templates.iter().find(|t| t.key == key)
    }

    fn status(&self, key: &str) -> ItemStatus {
        self.statuses.get(key).copied().unwrap_or(ItemStatus::Pending)
    }

    fn set_status(&mut self, key: &str, status: ItemStatus) {
        let _ = self.statuses.insert(key.to_owned(), status);
    }

    /// Marks every pending template whose dependencies are all created as
    /// ready and returns the ready keys in creation order.
    fn ready_keys(&mut self) -> Vec<String> {
        let newly_ready: Vec<String> = self
            .templates
            .iter()
            .filter(|t| self.status(&t.key) == ItemStatus::Pending)
            .filter(|t| {
                self.waiting_on
                    .get(&t.key)
                    .is_none_or(|deps| deps.iter().all(|d| self.status(d) == ItemStatus::Created))
            })
            .map(|t| t.key.clone())
            .collect();
        for key in &newly_ready {
            self.set_status(key, ItemStatus::Ready);
        }
        self.templates
            .iter()
            .filter(|t| self.status(&t.key) == ItemStatus::Ready)
            .map(|t| t.key.clone())
            .collect()
    }

    fn percent_done(&self) -> f64 {
        if self.total_cost <= 0.0 {
            return 100.0;
        }
        (self.done_cost / self.total_cost * 100.0).min(100.0)
    }

    /// Dependents of `key` that can no longer be attempted.
    fn stranded_by(&self, key: &str) -> Vec<String> {
        self.dependents
            .get(key)
            .map(|keys| {
                keys.iter()
                    .filter(|k| !self.status(k).is_terminal())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn created_item(&self, key: &str) -> Option<&CreatedItem> {
        self.created.iter().find(|c| c.key == key).map(|c| &c.item)
    }

    fn into_report(self, outcome: Outcome) -> DeploymentReport {
        let mut groups = self.groups;
        let items = self
            .created
            .into_iter()
            .map(|c| DeployedItem {
                groups: groups.remove(&c.key).unwrap_or_default(),
                id: c.item.id,
                url: c.item.url,
                kind: c.item.kind,
                key: c.key,
                created_at: c.at,
            })
            .collect();
        DeploymentReport {
            outcome,
            items,
            rolled_back: self.rolled_back,
            statuses: self.statuses,
            dictionary: self.dictionary,
        }
    }
}

/// Drives the creation of a set of templates against a destination.
pub struct Deployer {
    destination: Arc<dyn Destination>,
    config: DeployConfig,
    progress: Arc<dyn ProgressCallback>,
}

impl Deployer {
    /// Creates a deployer that logs progress and never cancels.
    #[must_use]
    pub fn new(destination: Arc<dyn Destination>, config: DeployConfig) -> Self {
        Self {
            destination,
            config,
            progress: Arc::new(LogProgress),
        }
    }

    /// Replaces the progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: impl ProgressCallback + 'static) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    /// Creates every template, dependencies first.
    ///
    /// Independent templates are created concurrently, at most
    /// `max_concurrency` at a time. A template is created only after every
    /// dependency inside the run has been created and recorded. Each
    /// template is resolved against the dictionary before it is handed to
    /// the destination.
    ///
    /// Cancellation through the progress callback is not an error: the run
    /// stops launching, waits for in-flight creations, rolls back and
    /// returns a report with [`Outcome::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`SolutionError::CyclicDependency`] before anything is
    /// created if the dependency lists form a cycle, an error from
    /// [`Destination::prepare`], or [`SolutionError::ItemFailed`] after
    /// cleanup when an item cannot be created or post-processed.
    pub async fn deploy(&self, templates: Vec<ItemTemplate>) -> Result<DeploymentReport> {
        let graph = DependencyGraph::from_templates(&templates);
        let order = graph.resolve_order()?;
        let mut run = Run::new(templates, &order, &graph, self.config.initial_dictionary());
        tracing::info!(
            items = run.templates.len(),
            concurrency = self.config.concurrency(),
            "deployment started"
        );

        let containers = self.destination.prepare(&self.config).await?;
        let mut in_flight: FuturesUnordered<Creation> = FuturesUnordered::new();
        loop {
            if run.stop.is_none() {
                self.launch_ready(&mut run, &mut in_flight);
            }
            let Some((key, result)) = in_flight.next().await else {
                break;
            };
            self.complete(&mut run, key, result).await;
        }

        if run.stop.is_none() {
            self.post_process(&mut run).await;
        }
        match run.stop.take() {
            None => {
                tracing::info!(items = run.created.len(), "deployment completed");
                Ok(run.into_report(Outcome::Completed))
            }
            Some(Stop::Cancelled) => {
                tracing::warn!("deployment cancelled");
                self.cleanup(&mut run, &containers, true).await;
                Ok(run.into_report(Outcome::Cancelled))
            }
            Some(Stop::Failed { key, message }) => {
                tracing::error!(key = %key, error = %message, "deployment failed");
                self.cleanup(&mut run, &containers, false).await;
                Err(SolutionError::ItemFailed { key, message })
            }
        }
    }

    fn report(&self, run: &Run, key: &str, status: ItemStatus) -> bool {
        self.progress.report(&ProgressEvent {
            key: key.to_owned(),
            status,
            percent_done: run.percent_done(),
        })
    }

    fn launch_ready(&self, run: &mut Run, in_flight: &mut FuturesUnordered<Creation>) {
        for key in run.ready_keys() {
            if in_flight.len() >= self.config.concurrency() {
                break;
            }
            if !self.report(run, &key, ItemStatus::Ready) {
                tracing::warn!(key = %key, "cancelled before creation");
                run.set_status(&key, ItemStatus::Cancelled);
                run.stop = Some(Stop::Cancelled);
                break;
            }
            let Some(template) = run.template(&key) else {
                continue;
            };
            let resolved = Resolver::new(&run.dictionary).resolve_template(template);
            let snapshot = run.dictionary.clone();
            let destination = Arc::clone(&self.destination);
            run.set_status(&key, ItemStatus::Creating);
            tracing::debug!(key = %key, kind = %resolved.kind, "creating item");
            in_flight.push(Box::pin(async move {
                let result = destination.create_item(&resolved, &snapshot).await;
                (resolved.key, result)
            }));
        }
    }

    async fn complete(&self, run: &mut Run, key: String, result: Result<CreatedItem>) {
        let item = match result {
            Ok(item) => item,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "item creation failed");
                run.set_status(&key, ItemStatus::Failed);
                let stranded = run.stranded_by(&key);
                if !stranded.is_empty() {
                    tracing::warn!(key = %key, dependents = ?stranded, "dependents will not be created");
                }
                if !matches!(run.stop, Some(Stop::Failed { .. })) {
                    run.stop = Some(Stop::Failed {
                        key,
                        message: e.to_string(),
                    });
                }
                return;
            }
        };

        run.dictionary.insert_record(key.clone(), &item.to_record());
        run.set_status(&key, ItemStatus::Created);
        let cost = run.template(&key).map_or(0.0, |t| t.cost_factor.max(0.0));
        run.done_cost += cost;
        tracing::info!(key = %key, id = %item.id, "item created");

        if run.stop.is_none() && !self.report(run, &key, ItemStatus::Created) {
            tracing::warn!(key = %key, "cancelled after creation, removing item");
            let removed = self.destination.remove_item(&item).await;
            if let Err(e) = removed {
                tracing::warn!(key = %key, error = %e, "failed to remove cancelled item");
            }
            let _ = run.dictionary.remove(&key);
            run.set_status(&key, ItemStatus::Cancelled);
            run.rolled_back.push(key);
            run.stop = Some(Stop::Cancelled);
            return;
        }

        run.created.push(Created {
            key: key.clone(),
            item,
            at: Utc::now(),
        });
        if run.stop.is_none() {
            self.bind_groups(run, &key).await;
        }
    }

    /// Shares newly created items with their groups once both exist.
    async fn bind_groups(&self, run: &mut Run, key: &str) {
        let Some(template) = run.template(key) else {
            return;
        };
        let mut bindings: Vec<(String, String)> = template
            .group_memberships
            .iter()
            .filter_map(|group| run.dictionary.item_id(group).map(|id| (key.to_owned(), id.to_owned())))
            .collect();
        if template.is_group() {
            if let Some(group_id) = run.dictionary.item_id(key) {
                bindings.extend(
                    run.created
                        .iter()
                        .filter(|c| c.key != key)
                        .filter(|c| {
                            run.template(&c.key)
                                .is_some_and(|t| t.group_memberships.iter().any(|g| g == key))
                        })
                        .map(|c| (c.key.clone(), group_id.to_owned())),
                );
            }
        }

        for (member, group_id) in bindings {
            let Some(item) = run.created_item(&member).cloned() else {
                continue;
            };
            let shared = self.destination.add_to_group(&item, &group_id).await;
            match shared {
                Ok(()) => {
                    tracing::debug!(key = %member, group = %group_id, "shared with group");
                    run.groups.entry(member).or_default().push(group_id);
                }
                Err(e) => tracing::warn!(key = %member, group = %group_id, error = %e, "failed to share with group"),
            }
        }
    }

    async fn post_process(&self, run: &mut Run) {
        let pending: Vec<(String, CreatedItem)> = run
            .created
            .iter()
            .filter(|c| c.item.post_process_needed)
            .map(|c| (c.key.clone(), c.item.clone()))
            .collect();
        for (key, item) in pending {
            let Some(template) = run.template(&key) else {
                continue;
            };
            let resolved = Resolver::new(&run.dictionary).resolve_template(template);
            let processed = self.destination.post_process(&item, &resolved, &run.dictionary).await;
            if let Err(e) = processed {
                tracing::error!(key = %key, error = %e, "post-processing failed");
                run.set_status(&key, ItemStatus::Failed);
                run.stop = Some(Stop::Failed {
                    key,
                    message: e.to_string(),
                });
                return;
            }
            tracing::debug!(key = %key, "item post-processed");
        }
    }

    /// Removes created items in reverse creation order, then the run's
    /// containers. Failures are logged and skipped.
    ///
    /// A cancelled run is always rolled back; `cleanup_on_failure` only
    /// governs failed runs.
    async fn cleanup(&self, run: &mut Run, containers: &[ContainerResource], cancelled: bool) {
        if !cancelled && !self.config.cleanup_on_failure {
            tracing::warn!(items = run.created.len(), "cleanup disabled, leaving created items");
            return;
        }
        let mut kept = Vec::new();
        while let Some(created) = run.created.pop() {
            let removed = self.destination.remove_item(&created.item).await;
            match removed {
                Ok(()) => {
                    tracing::info!(key = %created.key, id = %created.item.id, "item removed");
                    let _ = run.dictionary.remove(&created.key);
                    let _ = run.groups.remove(&created.key);
                    run.rolled_back.push(created.key);
                }
                Err(e) => {
                    tracing::warn!(key = %created.key, error = %e, "failed to remove item");
                    kept.push(created);
                }
            }
        }
        kept.reverse();
        run.created = kept;
        for container in containers.iter().rev() {
            if let Err(e) = self.destination.remove_container(container).await {
                tracing::warn!(kind = %container.kind, id = %container.id, error = %e, "failed to remove container");
            }
        }
    }
}
