//! The `Sink` interface and its MongoDB-backed implementation.
//!
//! Grounded in the original `mm/datastorage.go`, which wrote one MongoDB
//! document per metric per interval via `gopkg.in/mgo.v2`. `MongoSink` keeps
//! that shape (one document per metric) but batches the writes with
//! `insert_many` and never panics on a failed dial — the original's
//! `panic(err)` on `mgo.Dial` is explicitly not reproduced (spec.md §9).

use crate::stats::Summary;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use mongodb::Client;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info_span, instrument, warn};
use tracing_futures::Instrument as _;

/// The finalized summaries for one monitored entity (here, always exactly
/// one: the MySQL server the collector is attached to).
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceSummary {
    /// Finalized summaries keyed by metric name. Metrics with zero
    /// observations during the interval are omitted.
    pub stats: HashMap<String, Summary>,
}

/// The finalized output of one closed interval.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Wall-clock start of the interval, UTC.
    pub ts: DateTime<Utc>,
    /// Interval length in seconds.
    pub duration: u32,
    pub instances: Vec<InstanceSummary>,
}

/// One document written per metric per interval.
#[derive(Debug, Clone, Serialize)]
struct MetricDocument<'a> {
    ts: DateTime<Utc>,
    duration: u32,
    name: &'a str,
    values: &'a [f64],
    cnt: usize,
    min: f64,
    pct5: f64,
    avg: f64,
    med: f64,
    pct95: f64,
    max: f64,
}

/// Durable persistence for finalized reports.
///
/// Mirrors the shape of `Collector` in `src/collectors/mod.rs`: a trait with
/// a `BoxFuture`-returning method rather than `#[async_trait]`, so it can be
/// stored behind `Arc<dyn Sink + Send + Sync>` without extra boxing at the
/// call site.
pub trait Sink {
    /// Persist one `Report` for the named service.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. Callers (the aggregator) log and
    /// continue; a sink failure never panics the pipeline.
    fn write<'a>(&'a self, service: &'a str, report: &'a Report) -> BoxFuture<'a, Result<()>>;
}

/// Writes reports to a MongoDB collection, one document per metric.
pub struct MongoSink {
    client: Client,
    database: String,
    collection: String,
}

impl MongoSink {
    /// Connect to the document store.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the initial
    /// handshake fails.
    pub async fn connect(uri: &str, database: impl Into<String>) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .with_context(|| "failed to connect to document store")?;
        Ok(Self {
            client,
            database: database.into(),
            collection: "metrics".to_string(),
        })
    }
}

impl Sink for MongoSink {
    #[instrument(skip(self, report), fields(service = service, instances = report.instances.len()))]
    fn write<'a>(&'a self, service: &'a str, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let coll = self
                .client
                .database(&self.database)
                .collection::<mongodb::bson::Document>(&self.collection);

            let mut docs = Vec::new();
            for instance in &report.instances {
                for (name, summary) in &instance.stats {
                    let doc = MetricDocument {
                        ts: report.ts,
                        duration: report.duration,
                        name,
                        values: &summary.values,
                        cnt: summary.cnt,
                        min: summary.min,
                        pct5: summary.pct5,
                        avg: summary.avg,
                        med: summary.med,
                        pct95: summary.pct95,
                        max: summary.max,
                    };
                    docs.push(mongodb::bson::to_document(&doc)?);
                }
            }

            if docs.is_empty() {
                return Ok(());
            }

            let span = info_span!("sink.insert_many", service, count = docs.len());
            coll.insert_many(docs, None)
                .instrument(span)
                .await
                .with_context(|| format!("failed to write report for service '{service}'"))?;

            Ok(())
        })
    }
}

/// An in-memory sink, useful for tests: collects every written report.
#[derive(Default)]
pub struct MemorySink {
    pub reports: std::sync::Mutex<Vec<(String, Report)>>,
}

impl Sink for MemorySink {
    fn write<'a>(&'a self, service: &'a str, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut guard = self
                .reports
                .lock()
                .map_err(|_| anyhow::anyhow!("memory sink mutex poisoned"))?;
            guard.push((service.to_string(), report.clone()));
            Ok(())
        })
    }
}

/// A sink that always fails, used to exercise the aggregator's "log and
/// continue" failure handling.
pub struct FailingSink;

impl Sink for FailingSink {
    fn write<'a>(&'a self, _service: &'a str, _report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            warn!("FailingSink: simulated write failure");
            Err(anyhow::anyhow!("simulated sink failure"))
        })
    }
}
