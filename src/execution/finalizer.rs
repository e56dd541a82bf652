//! Run finalization

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::models::{RunId, RunStatistics};

/// Turns collected exit codes into final run statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFinalizer;

impl RunFinalizer {
    /// Finalize a run that ends now
    pub fn finalize(
        run_id: &RunId,
        started_at: DateTime<Utc>,
        exit_codes: BTreeMap<usize, i32>,
    ) -> RunStatistics {
        Self::finalize_at(run_id, started_at, Utc::now(), exit_codes)
    }

    /// Finalize a run with an explicit end time.
    ///
    /// Elapsed time is truncated to whole seconds and clamped at zero when
    /// the clock went backwards.
    pub fn finalize_at(
        run_id: &RunId,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        exit_codes: BTreeMap<usize, i32>,
    ) -> RunStatistics {
        let run_time_secs = finished_at
            .signed_duration_since(started_at)
            .num_seconds()
            .max(0) as u64;

        info!(
            "Run {} finished in {}s: {} commands",
            run_id,
            run_time_secs,
            exit_codes.len()
        );

        RunStatistics {
            run_id: run_id.clone(),
            started_at,
            finished_at,
            run_time_secs,
            exit_codes,
            finished: true,
        }
    }
}
