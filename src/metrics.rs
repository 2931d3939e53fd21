use std::sync::atomic::{AtomicU64, Ordering};

use crate::processing::Stage;

/// Thread-safe counters describing pipeline activity since startup.
#[derive(Default)]
pub struct RunMetrics {
    runs_started: AtomicU64,
    summaries_generated: AtomicU64,
    extraction_failures: AtomicU64,
    indexing_failures: AtomicU64,
    summarization_failures: AtomicU64,
}

impl RunMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that an upload entered the pipeline.
    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that produced a summary.
    pub fn record_summary(&self) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that halted at `stage`.
    pub fn record_failure(&self, stage: Stage) {
        let counter = match stage {
            Stage::Extraction => &self.extraction_failures,
            Stage::Indexing => &self.indexing_failures,
            Stage::Summarization => &self.summarization_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            indexing_failures: self.indexing_failures.load(Ordering::Relaxed),
            summarization_failures: self.summarization_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of run counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Uploads that entered the pipeline.
    pub runs_started: u64,
    /// Runs that ended with a summary.
    pub summaries_generated: u64,
    /// Runs halted during text extraction (including "no text").
    pub extraction_failures: u64,
    /// Runs halted while embedding or indexing chunks.
    pub indexing_failures: u64,
    /// Runs halted while generating the summary.
    pub summarization_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_runs_and_failures_per_stage() {
        let metrics = RunMetrics::new();
        metrics.record_run_started();
        metrics.record_run_started();
        metrics.record_run_started();
        metrics.record_summary();
        metrics.record_failure(Stage::Extraction);
        metrics.record_failure(Stage::Summarization);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.runs_started, 3);
        assert_eq!(snapshot.summaries_generated, 1);
        assert_eq!(snapshot.extraction_failures, 1);
        assert_eq!(snapshot.indexing_failures, 0);
        assert_eq!(snapshot.summarization_failures, 1);
    }

    #[test]
    fn snapshot_starts_at_zero() {
        assert_eq!(RunMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
