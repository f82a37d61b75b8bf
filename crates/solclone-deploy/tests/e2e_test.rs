//! End-to-end tests for the deployment scheduler.
//!
//! These tests drive `Deployer` against the dry-run destination:
//! 1. Dependency ordering and resolution of earlier items' identities
//! 2. Bounded concurrency
//! 3. Cancellation before and after creation
//! 4. Failure with cleanup of created items and containers
//! 5. Late-bound group membership
//! 6. Post-processing and cycle rejection

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use solclone_common::config::DeployConfig;
use solclone_common::error::SolutionError;
use solclone_common::types::{ItemStatus, ItemTemplate};
use solclone_deploy::dry_run::DestinationCall;
use solclone_deploy::{Deployer, DryRunDestination, Outcome, ProgressEvent};

fn template(key: &str, deps: &[&str]) -> ItemTemplate {
    ItemTemplate::new(key, "Web Map", json!({"item": {"id": format!("{{{{{key}.itemId}}}}")}}))
        .with_dependencies(deps.iter().copied())
}

fn position(keys: &[String], key: &str) -> usize {
    keys.iter().position(|k| k == key).expect(key)
}

// ── Ordering ─────────────────────────────────────────────────────────

#[tokio::test]
async fn deploy_creates_dependencies_first_and_resolves_them() {
    let service = ItemTemplate::new(
        "A",
        "Feature Service",
        json!({
            "item": {"id": "{{A.itemId}}", "name": "Permits"},
            "properties": {"layers": [{"id": 0, "fields": [{"name": "Status"}]}]}
        }),
    );
    let map = ItemTemplate::new(
        "B",
        "Web Map",
        json!({"data": {"operationalLayers": [{
            "itemId": "{{A.itemId}}",
            "url": "{{A.layer0.url}}",
            "title": "{{A.name}}",
            "definitionExpression": "{{A.layer0.fields.status.name}} = 'open'"
        }]}}),
    )
    .with_dependencies(["A"]);

    let dest = Arc::new(DryRunDestination::new());
    let report = Deployer::new(dest.clone(), DeployConfig::default())
        .deploy(vec![map, service])
        .await
        .expect("deploy");

    assert_eq!(report.outcome, Outcome::Completed);
    assert_eq!(dest.created_keys().await, vec!["A", "B"]);

    let a = report.item("A").expect("A deployed");
    let received = dest.received("B").await.expect("B received");
    let layer = &received.document["data"]["operationalLayers"][0];
    assert_eq!(layer["itemId"], a.id.as_str());
    assert_eq!(layer["url"], format!("{}/0", a.url.as_deref().unwrap()));
    assert_eq!(layer["title"], "Permits");
    assert_eq!(layer["definitionExpression"], "Status = 'open'");
    assert_eq!(report.dictionary.item_id("A"), Some(a.id.as_str()));
    assert_eq!(report.status("B"), Some(ItemStatus::Created));
}

#[tokio::test]
async fn deploy_waits_for_every_dependency() {
    let dest = Arc::new(DryRunDestination::new().with_delay(Duration::from_millis(5)));
    let templates = vec![
        template("d", &["b", "c"]),
        template("b", &["a"]),
        template("c", &["a"]),
        template("a", &[]),
    ];
    let report = Deployer::new(dest.clone(), DeployConfig::default())
        .deploy(templates)
        .await
        .expect("deploy");
    assert_eq!(report.items.len(), 4);
    let created = dest.created_keys().await;
    assert!(position(&created, "a") < position(&created, "b"));
    assert!(position(&created, "a") < position(&created, "c"));
    assert!(position(&created, "b") < position(&created, "d"));
    assert!(position(&created, "c") < position(&created, "d"));
}

#[tokio::test]
async fn deploy_bounds_concurrency() {
    let dest = Arc::new(DryRunDestination::new().with_delay(Duration::from_millis(20)));
    let templates: Vec<ItemTemplate> = (0..6).map(|i| template(&format!("t{i}"), &[])).collect();
    let config = DeployConfig {
        max_concurrency: 2,
        ..DeployConfig::default()
    };
    let report = Deployer::new(dest.clone(), config).deploy(templates).await.expect("deploy");
    assert_eq!(report.items.len(), 6);
    assert_eq!(dest.max_in_flight(), 2);
}

#[tokio::test]
async fn deploy_with_zero_concurrency_runs_one_at_a_time() {
    let dest = Arc::new(DryRunDestination::new().with_delay(Duration::from_millis(5)));
    let config = DeployConfig {
        max_concurrency: 0,
        ..DeployConfig::default()
    };
    let report = Deployer::new(dest.clone(), config)
        .deploy(vec![template("x", &[]), template("y", &[])])
        .await
        .expect("deploy");
    assert_eq!(report.items.len(), 2);
    assert_eq!(dest.max_in_flight(), 1);
}

// ── Cancellation ─────────────────────────────────────────────────────

#[tokio::test]
async fn cancellation_before_creation_skips_item_and_rolls_back() {
    let dest = Arc::new(DryRunDestination::new());
    let report = Deployer::new(dest.clone(), DeployConfig::default())
        .with_progress(|e: &ProgressEvent| !(e.key == "B" && e.status == ItemStatus::Ready))
        .deploy(vec![template("A", &[]), template("B", &["A"]), template("C", &["B"])])
        .await
        .expect("cancellation is not an error");

    assert_eq!(report.outcome, Outcome::Cancelled);
    assert_eq!(dest.created_keys().await, vec!["A"]);
    assert!(dest.received("B").await.is_none());
    assert!(!report.dictionary.contains("B"));
    assert!(!report.dictionary.contains("A"));
    assert_eq!(report.rolled_back, vec!["A"]);
    assert!(report.items.is_empty());
    assert_eq!(report.status("B"), Some(ItemStatus::Cancelled));
    assert_eq!(report.status("C"), Some(ItemStatus::Pending));

    let calls = dest.calls().await;
    let removals = calls.iter().filter(|c| matches!(c, DestinationCall::Remove { .. })).count();
    let containers = calls
        .iter()
        .filter(|c| matches!(c, DestinationCall::RemoveContainer { .. }))
        .count();
    assert_eq!(removals, 1);
    assert_eq!(containers, 2);
}

#[tokio::test]
async fn cancellation_after_creation_removes_the_item() {
    let dest = Arc::new(DryRunDestination::new());
    let report = Deployer::new(dest.clone(), DeployConfig::default())
        .with_progress(|e: &ProgressEvent| e.status != ItemStatus::Created)
        .deploy(vec![template("A", &[]), template("B", &["A"])])
        .await
        .expect("cancellation is not an error");

    assert_eq!(report.outcome, Outcome::Cancelled);
    assert_eq!(dest.created_keys().await, vec!["A"]);
    assert_eq!(report.status("A"), Some(ItemStatus::Cancelled));
    assert!(!report.dictionary.contains("A"));
    assert_eq!(report.rolled_back, vec!["A"]);
}

#[tokio::test]
async fn cancellation_rolls_back_even_with_cleanup_disabled() {
    let dest = Arc::new(DryRunDestination::new());
    let config = DeployConfig {
        cleanup_on_failure: false,
        ..DeployConfig::default()
    };
    let report = Deployer::new(dest.clone(), config)
        .with_progress(|e: &ProgressEvent| !(e.key == "B" && e.status == ItemStatus::Ready))
        .deploy(vec![template("A", &[]), template("B", &["A"])])
        .await
        .expect("cancellation is not an error");

    assert_eq!(report.outcome, Outcome::Cancelled);
    assert!(report.items.is_empty());
    assert!(!report.dictionary.contains("A"));
    assert_eq!(report.rolled_back, vec!["A"]);

    let calls = dest.calls().await;
    let removals = calls.iter().filter(|c| matches!(c, DestinationCall::Remove { .. })).count();
    let containers = calls
        .iter()
        .filter(|c| matches!(c, DestinationCall::RemoveContainer { .. }))
        .count();
    assert_eq!(removals, 1);
    assert_eq!(containers, 2);
}

// ── Failure ──────────────────────────────────────────────────────────

#[tokio::test]
async fn failure_cleans_up_and_skips_dependents() {
    let dest = Arc::new(DryRunDestination::new().failing_on("B"));
    let config = DeployConfig {
        max_concurrency: 1,
        ..DeployConfig::default()
    };
    let result = Deployer::new(dest.clone(), config)
        .deploy(vec![template("A", &[]), template("B", &["A"]), template("C", &["B"])])
        .await;

    match result {
        Err(SolutionError::ItemFailed { key, message }) => {
            assert_eq!(key, "B");
            assert!(message.contains("rejected"), "got: {message}");
        }
        other => panic!("expected item failure, got {other:?}"),
    }
    assert_eq!(dest.created_keys().await, vec!["A"]);
    assert!(dest.received("C").await.is_none());

    let calls = dest.calls().await;
    let last_two: Vec<_> = calls.iter().rev().take(2).collect();
    assert!(last_two.iter().all(|c| matches!(c, DestinationCall::RemoveContainer { .. })));
    assert!(calls.iter().any(|c| matches!(c, DestinationCall::Remove { .. })));
}

#[tokio::test]
async fn failure_without_cleanup_leaves_items() {
    let dest = Arc::new(DryRunDestination::new().failing_on("B"));
    let config = DeployConfig {
        cleanup_on_failure: false,
        max_concurrency: 1,
        ..DeployConfig::default()
    };
    let result = Deployer::new(dest.clone(), config)
        .deploy(vec![template("A", &[]), template("B", &["A"])])
        .await;
    assert!(matches!(result, Err(SolutionError::ItemFailed { .. })));
    let calls = dest.calls().await;
    assert!(!calls.iter().any(|c| matches!(c, DestinationCall::Remove { .. } | DestinationCall::RemoveContainer { .. })));
}

// ── Groups ───────────────────────────────────────────────────────────

#[tokio::test]
async fn members_are_shared_once_group_exists() {
    let dest = Arc::new(DryRunDestination::new());
    let group = ItemTemplate::new("G", "Group", json!({"item": {"title": "Team"}})).with_dependencies(["M"]);
    let member = template("M", &[]).with_groups(["G", "existing"]);
    let mut config = DeployConfig::default();
    let _ = config.seed.insert("existing".into(), json!({"itemId": "g-existing"}));

    let report = Deployer::new(dest.clone(), config)
        .deploy(vec![member, group])
        .await
        .expect("deploy");

    let group_id = report.item("G").expect("group").id.clone();
    let mut groups = report.item("M").expect("member").groups.clone();
    groups.sort();
    let mut expected = vec![group_id, "g-existing".to_owned()];
    expected.sort();
    assert_eq!(groups, expected);

    let shares = dest
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, DestinationCall::AddToGroup { .. }))
        .count();
    assert_eq!(shares, 2);
}

// ── Post-processing & validation ─────────────────────────────────────

#[tokio::test]
async fn post_processing_runs_after_all_items_exist() {
    let dest = Arc::new(DryRunDestination::new().post_processing("A"));
    let report = Deployer::new(dest.clone(), DeployConfig::default())
        .deploy(vec![template("A", &[]), template("B", &["A"])])
        .await
        .expect("deploy");
    let a_id = report.item("A").expect("A").id.clone();
    let calls = dest.calls().await;
    let post = calls
        .iter()
        .position(|c| *c == DestinationCall::PostProcess { id: a_id.clone() })
        .expect("post-processed");
    let last_create = calls
        .iter()
        .rposition(|c| matches!(c, DestinationCall::Create { .. }))
        .expect("created");
    assert!(post > last_create);
}

#[tokio::test]
async fn cyclic_templates_are_rejected_before_creation() {
    let dest = Arc::new(DryRunDestination::new());
    let result = Deployer::new(dest.clone(), DeployConfig::default())
        .deploy(vec![template("A", &["B"]), template("B", &["A"])])
        .await;
    assert!(matches!(result, Err(SolutionError::CyclicDependency { .. })));
    assert!(dest.calls().await.is_empty());
}

#[tokio::test]
async fn seed_dictionary_satisfies_outside_dependencies() {
    let dest = Arc::new(DryRunDestination::new());
    let mut config = DeployConfig {
        solution_extent: Some(json!({"xmin": 0})),
        ..DeployConfig::default()
    };
    let _ = config.seed.insert("org".into(), json!({"itemId": "org-1", "url": "https://org"}));
    let map = ItemTemplate::new(
        "map",
        "Web Map",
        json!({"portal": "{{org.url}}", "extent": "{{solutionExtent}}"}),
    )
    .with_dependencies(["org"]);
    let report = Deployer::new(dest.clone(), config).deploy(vec![map]).await.expect("deploy");
    assert_eq!(report.outcome, Outcome::Completed);
    let received = dest.received("map").await.expect("received");
    assert_eq!(received.document, json!({"portal": "https://org", "extent": {"xmin": 0}}));
}
