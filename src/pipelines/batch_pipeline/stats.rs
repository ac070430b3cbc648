use super::outcome::Outcome;
use crate::core::ErrorKind;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Timing and tally for one orchestration call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// Wall-clock time from fan-out to the last recombined outcome.
    pub total_time: Duration,
    pub items_processed: usize,
    pub succeeded: usize,
    /// Failures of any kind, timeouts included.
    pub failed: usize,
    pub timed_out: usize,
}

impl BatchStats {
    pub(crate) fn start() -> BatchStatsBuilder {
        BatchStatsBuilder {
            start_time: Instant::now(),
        }
    }
}

pub(crate) struct BatchStatsBuilder {
    start_time: Instant,
}

impl BatchStatsBuilder {
    pub fn finish(self, outcomes: &[Outcome]) -> BatchStats {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let timed_out = outcomes
            .iter()
            .filter_map(Outcome::error)
            .filter(|e| e.kind == ErrorKind::Timeout)
            .count();
        BatchStats {
            total_time: self.start_time.elapsed(),
            items_processed: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            timed_out,
        }
    }
}
