//! Time-bucketing reducer: assigns arriving [`Collection`]s to fixed-width
//! intervals, advances windows monotonically, finalizes summaries, and emits
//! a [`Report`] to a [`Sink`].
//!
//! Ported from `mm/aggregator.go` (`Aggregator.run`, `Aggregator.report`,
//! `GoTime`).

use crate::sink::{InstanceSummary, Report, Sink};
use crate::stats::{Collection, Stats};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

/// Default interval width, in seconds.
pub const DEFAULT_INTERVAL_SECONDS: i64 = 60;

/// Compute the start of the interval `unix_ts` falls in.
///
/// Idempotent on boundaries: `interval_start(60, 120) == 120`. Otherwise
/// rounds down to the previous boundary: `interval_start(60, 130) == 120`.
#[must_use]
pub const fn interval_start(interval_secs: i64, unix_ts: i64) -> i64 {
    (unix_ts.div_euclid(interval_secs)) * interval_secs
}

/// Time-bucketing reducer. Owns the persistent per-metric accumulators for
/// a single instance; no lock is needed because exactly one task ever
/// touches them.
pub struct Aggregator<S: Sink> {
    interval_secs: i64,
    sink: Arc<S>,
    service: String,
}

impl<S: Sink> Aggregator<S> {
    #[must_use]
    pub fn new(interval_secs: i64, sink: Arc<S>) -> Self {
        Self {
            interval_secs,
            sink,
            service: "mm".to_string(),
        }
    }

    /// Drive the run loop to completion: consume collections from `rx` until
    /// the channel closes (collector shutdown), bucketing them into
    /// intervals and reporting each closed interval to the sink.
    ///
    /// Mirrors `Aggregator.run` in the original: the in-flight interval at
    /// shutdown is not finalized (acceptable per spec.md §5).
    pub async fn run(&self, mut rx: Receiver<Collection>) {
        let mut current_floor: Option<i64> = None;
        let mut stats: HashMap<String, Stats> = HashMap::new();

        while let Some(collection) = rx.recv().await {
            self.ingest(collection, &mut current_floor, &mut stats).await;
        }
    }

    async fn ingest(
        &self,
        collection: Collection,
        current_floor: &mut Option<i64>,
        stats: &mut HashMap<String, Stats>,
    ) {
        let floor = interval_start(self.interval_secs, collection.ts);

        match *current_floor {
            None => {
                debug!(interval_start = floor, "starting first interval");
                *current_floor = Some(floor);
            }
            Some(cur) if floor > cur => {
                self.report(cur, stats).await;
                for s in stats.values_mut() {
                    s.reset();
                }
                debug!(interval_start = floor, "advanced to next interval");
                *current_floor = Some(floor);
            }
            Some(cur) if floor < cur => {
                warn!(
                    collection_interval = floor,
                    current_interval = cur,
                    "discarding late collection for a past interval"
                );
                return;
            }
            Some(_) => {}
        }

        for metric in &collection.metrics {
            let entry = stats
                .entry(metric.name.clone())
                .or_insert_with(|| Stats::new(metric.kind));

            if entry.kind() != metric.kind {
                warn!(
                    metric = metric.name,
                    "metric kind changed for an existing name; ignoring sample"
                );
                continue;
            }

            if let Err(lap) = entry.add(metric, collection.ts) {
                info!(metric = metric.name, %lap, "counter value-lap anomaly");
            }
        }
    }

    async fn report(&self, start_floor: i64, stats: &HashMap<String, Stats>) {
        debug!(interval_start = start_floor, "summarizing interval");

        let mut finalized = HashMap::new();
        for (name, s) in stats {
            if let Some(summary) = s.finalize() {
                finalized.insert(name.clone(), summary);
            }
        }

        if finalized.is_empty() {
            warn!(interval_start = start_floor, "no metrics collected for interval");
            return;
        }

        let ts = DateTime::<Utc>::from_timestamp(start_floor, 0).unwrap_or_else(Utc::now);
        let report = Report {
            ts,
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            duration: self.interval_secs as u32,
            instances: vec![InstanceSummary { stats: finalized }],
        };

        if let Err(err) = self.sink.write(&self.service, &report).await {
            warn!(error = %err, "failed to write report; interval is lost");
        }
    }
}
