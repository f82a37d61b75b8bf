//! Progress reporting and cooperative cancellation.
//!
//! The scheduler reports each item twice: when it is about to be created
//! and once it has been created. Returning `false` from either report
//! stops the run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use solclone_common::types::ItemStatus;

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Template key.
    pub key: String,
    /// Status the item just entered.
    pub status: ItemStatus,
    /// Share of the run's total cost already created, 0 to 100.
    pub percent_done: f64,
}

/// Receives progress events; `false` requests cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Handles one event and says whether the run may continue.
    fn report(&self, event: &ProgressEvent) -> bool;
}

impl<F> ProgressCallback for F
where
    F: Fn(&ProgressEvent) -> bool + Send + Sync,
{
    fn report(&self, event: &ProgressEvent) -> bool {
        self(event)
    }
}

/// Logs every event and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn report(&self, event: &ProgressEvent) -> bool {
        tracing::info!(
            key = %event.key,
            status = %event.status,
            percent = format_args!("{:.0}", event.percent_done),
            "progress"
        );
        true
    }
}

/// A shared flag that cancels the run once set, e.g. from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl ProgressCallback for CancellationFlag {
    fn report(&self, event: &ProgressEvent) -> bool {
        let keep_going = !self.is_cancelled();
        if keep_going {
            tracing::debug!(key = %event.key, status = %event.status, "progress");
        }
        keep_going
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> ProgressEvent {
        ProgressEvent {
            key: "a".into(),
            status: ItemStatus::Ready,
            percent_done: 0.0,
        }
    }

    #[test]
    fn closures_are_callbacks() {
        let stop_on_a = |e: &ProgressEvent| e.key != "a";
        assert!(!stop_on_a.report(&event()));
        assert!(LogProgress.report(&event()));
    }

    #[test]
    fn cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let handle = flag.clone();
        assert!(flag.report(&event()));
        handle.cancel();
        assert!(flag.is_cancelled());
        assert!(!flag.report(&event()));
    }
}
