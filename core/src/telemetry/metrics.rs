use crate::monitor::TickSummary;
use std::sync::Mutex;

/// Running totals across every tick the monitor has executed.
pub struct MonitorMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub ticks: usize,
    pub fetch_failures: usize,
    pub violations_created: usize,
    pub resolve_failures: usize,
    pub store_failures: usize,
    pub evicted: usize,
    pub dispatches: usize,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_tick(&self, summary: &TickSummary) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.ticks += 1;
            if summary.fetch_failed {
                metrics.fetch_failures += 1;
            }
            metrics.violations_created += summary.created;
            metrics.resolve_failures += summary.unresolved;
            metrics.store_failures += summary.store_failures;
            metrics.evicted += summary.evicted;
            if summary.dispatched {
                metrics.dispatches += 1;
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        match self.inner.lock() {
            Ok(metrics) => *metrics,
            Err(_) => MetricsSnapshot::default(),
        }
    }
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_accumulate() {
        let metrics = MonitorMetrics::new();
        metrics.record_tick(&TickSummary {
            created: 2,
            unresolved: 1,
            dispatched: true,
            ..Default::default()
        });
        metrics.record_tick(&TickSummary {
            fetch_failed: true,
            evicted: 2,
            ..Default::default()
        });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.fetch_failures, 1);
        assert_eq!(snapshot.violations_created, 2);
        assert_eq!(snapshot.resolve_failures, 1);
        assert_eq!(snapshot.evicted, 2);
        assert_eq!(snapshot.dispatches, 1);
    }
}
