//! Reference-counted MySQL connection with capped exponential backoff.
//!
//! Ported from `src/mysql/mysql.go` (`Connection.Connect`/`Connection.Close`):
//! the original keeps a `connectedAmount uint` so multiple logical owners can
//! share one underlying connection, opening on the first caller and closing
//! only when the last releases it. `SqlxConnector` keeps that shape around a
//! pooled `sqlx::MySqlPool` instead of a single `*sql.DB`.

use crate::error::CollectError;
use futures::future::BoxFuture;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySqlPool, Row};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const BACKOFF_BASE: Duration = Duration::from_millis(100);
const BACKOFF_FACTOR: u32 = 2;
const BACKOFF_CAP: Duration = Duration::from_secs(20);

/// One raw `SHOW STATUS` row.
#[derive(Debug, Clone)]
pub struct StatusRow {
    pub name: String,
    pub value: String,
}

/// One raw `INFORMATION_SCHEMA.INNODB_METRICS` row.
#[derive(Debug, Clone)]
pub struct InnodbMetricRow {
    pub name: String,
    pub subsystem: String,
    pub metric_type: String,
    pub value: f64,
}

/// What the collector needs from a live MySQL connection.
///
/// Shaped like `Collector` in `src/collectors/mod.rs`: a trait with
/// `BoxFuture`-returning methods rather than `#[async_trait]`, kept behind a
/// trait object so tests can substitute a mock without a live database.
pub trait Connector: Send + Sync {
    /// Establish (or reuse, via ref-counting) the underlying connection.
    fn connect(&self) -> BoxFuture<'_, Result<(), CollectError>>;

    /// Release one reference; closes the pool when the last is released.
    fn close(&self) -> BoxFuture<'_, Result<(), CollectError>>;

    fn query_status(&self) -> BoxFuture<'_, Result<Vec<StatusRow>, CollectError>>;

    /// `SELECT NAME, SUBSYSTEM, COUNT, TYPE FROM INFORMATION_SCHEMA.INNODB_METRICS
    /// WHERE STATUS='enabled'` — every currently-enabled InnoDB counter. The
    /// caller decides whether to call this at all (the InnoDB filter is a
    /// collect/don't-collect gate, not a SQL-level name filter, matching the
    /// original's unfiltered query).
    fn query_innodb_metrics(&self) -> BoxFuture<'_, Result<Vec<InnodbMetricRow>, CollectError>>;
}

/// Exponential backoff with a hard cap, matching the original's
/// `backoff.NewExponentialBackOff()` usage in `Connection.Connect`.
pub struct Backoff {
    next: Mutex<Duration>,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            next: Mutex::new(BACKOFF_BASE),
        }
    }
}

/// Lock a `Mutex`, recovering from poisoning rather than panicking. A panic
/// in one collector task shouldn't take down backoff/connection bookkeeping
/// for the rest of the process.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl Backoff {
    /// Sleep for the current backoff duration, then double it (capped).
    pub async fn wait(&self) {
        let dur = {
            let mut next = lock(&self.next);
            let current = *next;
            *next = (current * BACKOFF_FACTOR).min(BACKOFF_CAP);
            current
        };
        sleep(dur).await;
    }

    /// Reset to the base delay after a successful connection.
    pub fn reset(&self) {
        *lock(&self.next) = BACKOFF_BASE;
    }
}

/// `sqlx`-backed connector for a single DSN, with ref-counted open/close.
pub struct SqlxConnector {
    dsn: String,
    pool: Mutex<Option<MySqlPool>>,
    refs: Mutex<u32>,
    backoff: Backoff,
}

impl SqlxConnector {
    #[must_use]
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            pool: Mutex::new(None),
            refs: Mutex::new(0),
            backoff: Backoff::default(),
        }
    }

    fn pool_handle(&self) -> Result<MySqlPool, CollectError> {
        lock(&self.pool)
            .clone()
            .ok_or_else(|| CollectError::Other(anyhow::anyhow!("connector not connected")))
    }
}

impl Connector for SqlxConnector {
    #[instrument(skip(self), level = "info")]
    fn connect(&self) -> BoxFuture<'_, Result<(), CollectError>> {
        Box::pin(async move {
            {
                let mut refs = lock(&self.refs);
                if *refs > 0 {
                    *refs += 1;
                    debug!(refs = *refs, "reusing existing connection");
                    return Ok(());
                }
            }

            loop {
                match MySqlPoolOptions::new().max_connections(1).connect(&self.dsn).await {
                    Ok(pool) => {
                        *lock(&self.pool) = Some(pool);
                        *lock(&self.refs) = 1;
                        self.backoff.reset();
                        info!("connected to MySQL");
                        return Ok(());
                    }
                    Err(err) => {
                        let classified = CollectError::classify(err);
                        if matches!(classified, CollectError::InnodbAccessDenied) {
                            return Err(classified);
                        }
                        warn!(error = %classified, "connect failed, retrying with backoff");
                        self.backoff.wait().await;
                    }
                }
            }
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<(), CollectError>> {
        Box::pin(async move {
            let should_close = {
                let mut refs = lock(&self.refs);
                if *refs == 0 {
                    return Ok(());
                }
                *refs -= 1;
                *refs == 0
            };

            if should_close {
                if let Some(pool) = lock(&self.pool).take() {
                    pool.close().await;
                    debug!("closed MySQL connection (last reference released)");
                }
            }
            Ok(())
        })
    }

    #[instrument(skip(self), level = "info", err)]
    fn query_status(&self) -> BoxFuture<'_, Result<Vec<StatusRow>, CollectError>> {
        Box::pin(async move {
            let pool = self.pool_handle()?;
            let rows = sqlx::query("SHOW /*!50002 GLOBAL */ STATUS")
                .fetch_all(&pool)
                .await
                .map_err(CollectError::classify)?;

            rows.iter()
                .map(|row| {
                    let name: String = row.try_get("Variable_name").map_err(CollectError::classify)?;
                    let value: String = row.try_get("Value").map_err(CollectError::classify)?;
                    Ok(StatusRow {
                        name: name.to_lowercase(),
                        value,
                    })
                })
                .collect()
        })
    }

    #[instrument(skip(self), level = "info", err)]
    fn query_innodb_metrics(&self) -> BoxFuture<'_, Result<Vec<InnodbMetricRow>, CollectError>> {
        Box::pin(async move {
            let pool = self.pool_handle()?;
            let rows = sqlx::query(
                "SELECT NAME, SUBSYSTEM, COUNT, TYPE FROM INFORMATION_SCHEMA.INNODB_METRICS WHERE STATUS='enabled'",
            )
            .fetch_all(&pool)
            .await
            .map_err(|err| {
                let classified = CollectError::classify(err);
                if matches!(classified, CollectError::InnodbAccessDenied) {
                    warn!("InnoDB metrics access denied, filter will be cleared by caller");
                }
                classified
            })?;

            rows.iter()
                .map(|row| {
                    let name: String = row.try_get("NAME").map_err(CollectError::classify)?;
                    let subsystem: String = row.try_get("SUBSYSTEM").map_err(CollectError::classify)?;
                    let metric_type: String = row.try_get("TYPE").map_err(CollectError::classify)?;
                    let value: i64 = row.try_get("COUNT").map_err(CollectError::classify)?;
                    #[allow(clippy::cast_precision_loss)]
                    Ok(InnodbMetricRow {
                        name: name.to_lowercase(),
                        subsystem: subsystem.to_lowercase(),
                        metric_type,
                        value: value as f64,
                    })
                })
                .collect()
        })
    }
}
