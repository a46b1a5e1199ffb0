use super::reconcile::{Outcome, Reconciler};
use crate::geofence::NoFlyZone;
use crate::model::PositionReport;
use crate::prelude::{PilotDirectory, PresentationSink, ReportSource};
use crate::store::ViolationStore;
use crate::telemetry::MonitorMetrics;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub zone: NoFlyZone,
}

/// Per-tick outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub fetch_failed: bool,
    pub sightings: usize,
    pub outside: usize,
    pub created: usize,
    pub refreshed: usize,
    pub unresolved: usize,
    pub store_failures: usize,
    pub task_failures: usize,
    pub evicted: usize,
    pub dispatched: bool,
}

impl TickSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Outside => self.outside += 1,
            Outcome::Created => self.created += 1,
            Outcome::Refreshed => self.refreshed += 1,
            Outcome::Unresolved => self.unresolved += 1,
            Outcome::StoreFailed => self.store_failures += 1,
        }
    }
}

/// Polls the report source and keeps the violation store reconciled with it.
pub struct Monitor {
    config: MonitorConfig,
    reports: Arc<dyn ReportSource>,
    reconciler: Arc<Reconciler>,
    store: Arc<dyn ViolationStore>,
    metrics: Arc<MonitorMetrics>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        reports: Arc<dyn ReportSource>,
        pilots: Arc<dyn PilotDirectory>,
        store: Arc<dyn ViolationStore>,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(config.zone, pilots, Arc::clone(&store)));
        Self {
            config,
            reports,
            reconciler,
            store,
            metrics: Arc::new(MonitorMetrics::new()),
        }
    }

    pub fn metrics(&self) -> Arc<MonitorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Runs one fetch, evaluate, reconcile, notify cycle.
    ///
    /// Every sighting is evaluated on its own task and all tasks are joined
    /// before the eviction pass. Records touched in this tick carry the tick's
    /// start time, which is also the eviction reference.
    pub async fn tick<S>(&self, sink: &S) -> TickSummary
    where
        S: PresentationSink + ?Sized,
    {
        let tick_at = Utc::now();
        let mut summary = TickSummary::default();

        let report = match self.reports.current_positions().await {
            Ok(report) => report,
            Err(err) => {
                warn!("drone report unavailable: {}", err);
                summary.fetch_failed = true;
                PositionReport::empty()
            }
        };
        summary.sightings = report.samples.len();

        let mut tasks = JoinSet::new();
        for sample in report.samples {
            let reconciler = Arc::clone(&self.reconciler);
            tasks.spawn(async move { reconciler.reconcile(sample, tick_at).await });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.record(outcome),
                Err(err) => {
                    error!("drone evaluation task failed: {}", err);
                    summary.task_failures += 1;
                }
            }
        }

        match self.store.evict_expired(tick_at).await {
            Ok(evicted) => summary.evicted = evicted,
            Err(err) => warn!("eviction pass failed: {}", err),
        }

        if self.store.has_changes() {
            match self.store.as_slice().await {
                Ok(snapshot) => {
                    sink.on_change(&snapshot);
                    summary.dispatched = true;
                }
                Err(err) => {
                    warn!("snapshot unavailable, retrying next tick: {}", err);
                    self.store.mark_changed();
                }
            }
        }

        self.metrics.record_tick(&summary);
        debug!("tick finished: {:?}", summary);
        summary
    }

    /// Ticks on the configured interval until `shutdown` resolves, then tears
    /// down the store. A tick in progress always runs to completion.
    pub async fn run<S, F>(&self, sink: &S, shutdown: F)
    where
        S: PresentationSink + ?Sized,
        F: Future<Output = ()>,
    {
        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "monitoring no-fly zone at ({}, {}) radius {} m every {:?}",
            self.config.zone.origin_x,
            self.config.zone.origin_y,
            self.config.zone.radius_m,
            self.config.poll_interval
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.tick(sink).await;
                }
            }
        }

        self.store.destroy().await;
        let totals = self.metrics.snapshot();
        info!(
            "monitor stopped after {} ticks ({} fetch failures, {} dispatches)",
            totals.ticks, totals.fetch_failures, totals.dispatches
        );
    }
}
