//! Progress Reporting
//!
//! The pool pushes a [`ProgressSnapshot`] after every launch and every
//! completion. Whoever hosts the run decides where snapshots go: a task
//! tracker, a channel, or just the log.

use tokio::sync::{mpsc, watch};

use crate::models::ProgressSnapshot;

/// Receiver of progress snapshots
pub trait ProgressSink: Send + Sync {
    /// Called with the current state of the run
    fn publish(&self, snapshot: &ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressSnapshot) + Send + Sync,
{
    fn publish(&self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

impl ProgressSink for mpsc::UnboundedSender<ProgressSnapshot> {
    fn publish(&self, snapshot: &ProgressSnapshot) {
        if self.send(snapshot.clone()).is_err() {
            trace!("Progress receiver dropped for run {}", snapshot.run_id);
        }
    }
}

impl ProgressSink for watch::Sender<Option<ProgressSnapshot>> {
    fn publish(&self, snapshot: &ProgressSnapshot) {
        self.send_replace(Some(snapshot.clone()));
    }
}

/// Sink that discards every snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn publish(&self, _snapshot: &ProgressSnapshot) {}
}

/// Sink that writes snapshots to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn publish(&self, snapshot: &ProgressSnapshot) {
        info!(
            run_id = %snapshot.run_id,
            processing = snapshot.processing,
            pending = snapshot.pending,
            finished = snapshot.finished(),
            total = snapshot.total,
            "{}",
            snapshot.status
        );
    }
}
