//! Per-metric accumulators and their distribution summaries.
//!
//! Ported from the original `mm/stats.go`: a [`Stats`] accumulates the
//! observations of one metric within one interval and produces a [`Summary`]
//! on [`Stats::finalize`]. Counters additionally track the last two
//! observations across interval boundaries so a rate straddling the boundary
//! can still be computed.

use crate::error::ValueLap;
use serde::Serialize;

/// The two metric kinds the system understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Value sampled directly (e.g. `threads_running`).
    Gauge,
    /// Monotonically nondecreasing running total; the system records its
    /// per-second rate of change.
    Counter,
}

/// One observation: a name, its kind, and a finite value.
#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    pub name: String,
    pub kind: MetricKind,
    pub value: f64,
}

impl Metric {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MetricKind, value: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
        }
    }
}

/// One sampling event: every metric read from a single tick, sharing one
/// timestamp. Ownership transfers through the collector -> aggregator
/// channel; the collector must not mutate a `Collection` after sending it.
#[derive(Debug, Clone)]
pub struct Collection {
    /// UTC seconds-since-epoch of when sampling began.
    pub ts: i64,
    pub metrics: Vec<Metric>,
}

impl Collection {
    #[must_use]
    pub const fn new(ts: i64) -> Self {
        Self {
            ts,
            metrics: Vec::new(),
        }
    }
}

/// A detached, serializable distribution summary produced by
/// [`Stats::finalize`]. Holds no counter bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub values: Vec<f64>,
    pub cnt: usize,
    pub min: f64,
    pub pct5: f64,
    pub avg: f64,
    pub med: f64,
    pub pct95: f64,
    pub max: f64,
}

/// Per-metric accumulator, one per (instance, metric-name) pair.
///
/// Mutated exclusively by the aggregator task; reset (not recreated) on
/// interval advance so counter bookkeeping survives across boundaries.
#[derive(Debug, Clone)]
pub struct Stats {
    kind: MetricKind,
    values: Vec<f64>,
    sum: f64,

    // Counter bookkeeping. Preserved across `reset()`.
    first_val: bool,
    prev_ts: i64,
    prev_val: f64,
    penu_ts: i64,
    penu_val: f64,
}

impl Stats {
    #[must_use]
    pub fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            values: Vec::new(),
            sum: 0.0,
            first_val: true,
            prev_ts: 0,
            prev_val: 0.0,
            penu_ts: 0,
            penu_val: 0.0,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Clear the values accumulated this interval. Counter bookkeeping
    /// (`prev_ts`/`prev_val`/`penu_ts`/`penu_val`/`first_val`) survives so a
    /// rate straddling the interval boundary can still be computed against
    /// the last observation of the previous interval.
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }

    /// Fold one observation into the accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`ValueLap`] when the counter value-lap anomaly fires: the
    /// sample is still recorded, the error is purely informational.
    pub fn add(&mut self, metric: &Metric, ts: i64) -> Result<(), ValueLap> {
        match self.kind {
            MetricKind::Gauge => {
                self.values.push(metric.value);
                self.sum += metric.value;
                Ok(())
            }
            MetricKind::Counter => self.add_counter(metric.value, ts),
        }
    }

    fn add_counter(&mut self, value: f64, ts: i64) -> Result<(), ValueLap> {
        if self.first_val {
            self.penu_ts = self.prev_ts;
            self.penu_val = self.prev_val;
            self.prev_ts = ts;
            self.prev_val = value;
            self.first_val = false;
            return Ok(());
        }

        if value < self.prev_val {
            // Counter reset, e.g. FLUSH STATUS. No rate produced.
            self.penu_ts = self.prev_ts;
            self.penu_val = self.prev_val;
            self.prev_ts = ts;
            self.prev_val = value;
            return Ok(());
        }

        // value >= prev_val: expected case, compute the per-second rate.
        let lap = if self.penu_val > 0.0 && self.prev_val == 0.0 && value > self.penu_val {
            Some(ValueLap {
                penu_ts: self.penu_ts,
                penu_val: self.penu_val,
                prev_ts: self.prev_ts,
                prev_val: self.prev_val,
                cur_ts: ts,
                cur_val: value,
            })
        } else {
            None
        };

        let inc = value - self.prev_val;
        #[allow(clippy::cast_precision_loss)]
        let dur = (ts - self.prev_ts) as f64;
        let rate = inc / dur;
        self.values.push(rate);
        self.sum += rate;

        self.penu_ts = self.prev_ts;
        self.penu_val = self.prev_val;
        self.prev_ts = ts;
        self.prev_val = value;

        lap.map_or(Ok(()), Err)
    }

    /// Compute and return a detached summary, or `None` if no values were
    /// recorded this interval (`cnt == 0`).
    #[must_use]
    pub fn finalize(&self) -> Option<Summary> {
        if self.values.is_empty() {
            return None;
        }

        let mut values = self.values.clone();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let cnt = values.len();
        let min = *values.first()?;
        let max = *values.last()?;

        if cnt == 1 {
            return Some(Summary {
                values,
                cnt,
                min,
                pct5: min,
                avg: min,
                med: min,
                pct95: min,
                max,
            });
        }

        let pct5 = *values.get(5 * cnt / 100)?;
        let med = *values.get(50 * cnt / 100)?;
        let pct95 = *values.get(95 * cnt / 100)?;
        #[allow(clippy::cast_precision_loss)]
        let avg = self.sum / cnt as f64;

        Some(Summary {
            values,
            cnt,
            min,
            pct5,
            avg,
            med,
            pct95,
            max,
        })
    }
}
