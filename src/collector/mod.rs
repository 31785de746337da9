//! Resilient, reconnecting, tick-driven sampler.
//!
//! Ported from `mysqlCollector.go`'s `MySQLCollector`: a `connect()`
//! sub-task loops forever trying to establish a connection and signals
//! success over a channel; the main `run()` loop selects between the sample
//! tick and that connection signal, and while disconnected, ticks are
//! dropped with a warning rather than queued.

pub mod config;
pub mod connection;
pub mod dsn;
pub mod sample;
pub mod status_vars;

use crate::stats::Collection;
use config::Config;
use connection::Connector;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, instrument, warn};

/// Deadline for handing a sampled [`Collection`] to the aggregator. Mirrors
/// the original's 500ms `select`/`time.After` handoff: if the aggregator
/// can't keep up, the collection is dropped rather than blocking forever.
const HANDOFF_DEADLINE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Disconnected,
    Connected,
}

/// Drives sampling for a single MySQL instance until `shutdown` fires.
pub struct Collector<C: Connector + 'static> {
    connector: Arc<C>,
    config: Arc<Config>,
    interval: Duration,
}

impl<C: Connector + 'static> Collector<C> {
    #[must_use]
    pub fn new(connector: Arc<C>, config: Arc<Config>, interval: Duration) -> Self {
        Self {
            connector,
            config,
            interval,
        }
    }

    /// Run until `shutdown` observes `true`. Sampled collections are sent to
    /// `tx`; the aggregator owns the receiving end.
    #[instrument(skip(self, tx, shutdown))]
    pub async fn run(&self, tx: Sender<Collection>, mut shutdown: watch::Receiver<bool>) {
        let (connected_tx, mut connected_rx) = tokio::sync::mpsc::channel::<()>(1);
        let mut state = ConnectionState::Disconnected;
        let mut connect_task = Some(self.spawn_connect(connected_tx.clone()));

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if state == ConnectionState::Connected {
                        if self.sample_and_send(&tx).await.is_err() {
                            warn!("connection appears lost, reconnecting");
                            state = ConnectionState::Disconnected;
                            if let Err(err) = self.connector.close().await {
                                warn!(error = %err, "error closing stale connection");
                            }
                            connect_task = Some(self.spawn_connect(connected_tx.clone()));
                        }
                    } else {
                        warn!("lost MySQL metrics: not connected at tick");
                    }
                }
                Some(()) = connected_rx.recv() => {
                    info!("collector connected");
                    state = ConnectionState::Connected;
                    connect_task = None;
                }
                changed = shutdown.changed() => {
                    if changed.is_ok() && *shutdown.borrow() {
                        debug!("shutdown requested, stopping collector");
                        break;
                    }
                }
                else => break,
            }
        }

        if let Some(task) = connect_task {
            task.abort();
        }
        if let Err(err) = self.connector.close().await {
            warn!(error = %err, "error closing connection on shutdown");
        }
    }

    /// Spawn a one-shot background task that retries `connector.connect()`
    /// (with its own internal capped backoff) until it succeeds, then
    /// signals on `connected_tx`. Mirrors the original's `connect()`
    /// goroutine, minus its infinite post-success loop (a bug we do not
    /// reproduce: reconnection here is triggered explicitly by the caller on
    /// a detected failure instead).
    fn spawn_connect(&self, connected_tx: tokio::sync::mpsc::Sender<()>) -> tokio::task::JoinHandle<()> {
        let connector = Arc::clone(&self.connector);
        tokio::spawn(async move {
            if connector.connect().await.is_ok() {
                let _ = connected_tx.send(()).await;
            }
        })
    }

    async fn sample_and_send(&self, tx: &Sender<Collection>) -> Result<(), ()> {
        #[allow(clippy::cast_possible_truncation)]
        let ts = chrono::Utc::now().timestamp();

        match sample::sample(self.connector.as_ref(), &self.config, ts).await {
            Ok(collection) => {
                if collection.metrics.is_empty() {
                    debug!("no metrics collected this tick, dropping empty collection");
                } else if tokio::time::timeout(HANDOFF_DEADLINE, tx.send(collection)).await.is_err() {
                    warn!("lost MySQL metrics: aggregator handoff timed out");
                }
                Ok(())
            }
            Err(err) => {
                let lost_connection = matches!(err, crate::error::CollectError::Network(_));
                warn!(error = %err, "sample failed");
                if lost_connection { Err(()) } else { Ok(()) }
            }
        }
    }
}
