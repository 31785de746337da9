//! Typed error taxonomy for the collector/stats boundary.
//!
//! Everything above this layer (the aggregator run loop, `main`) deals in
//! `anyhow::Result`; these enums exist only where callers need to branch on
//! *kind* (network vs. access-denied vs. parse) rather than just log and move
//! on.

use thiserror::Error;

/// Errors raised while sampling a MySQL/MariaDB connection.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Transport-level failure: the connection is assumed dead and the
    /// collector must reconnect.
    #[error("network error talking to MySQL: {0}")]
    Network(#[source] sqlx::Error),

    /// `INFORMATION_SCHEMA.INNODB_METRICS` denied with
    /// `ER_SPECIFIC_ACCESS_DENIED_ERROR`; permanent for this session.
    #[error("InnoDB metrics access denied")]
    InnodbAccessDenied,

    /// A `SHOW STATUS` or InnoDB metrics value failed to parse as a float.
    #[error("cannot convert '{name}' value '{value}' to a number")]
    Parse { name: String, value: String },

    /// Anything else: logged and treated as a partial collection.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CollectError {
    /// Classify a `sqlx::Error` the way the original `collectError` did:
    /// distinguish transient network failures from everything else. Only
    /// transport-class failures (`net.OpError` in the original) reclassify as
    /// [`Self::Network`] and trigger a reconnect; anything else (a malformed
    /// query, a decode failure, an unrelated database error) is logged and
    /// treated as a partial collection per spec.md §4.1 step 4 — it must not
    /// be mistaken for a dead connection.
    #[must_use]
    pub fn classify(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if is_access_denied(db_err.as_ref()) => {
                Self::InnodbAccessDenied
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Network(err),
            other => Self::Other(anyhow::Error::new(other)),
        }
    }
}

/// MySQL error code 1227: `ER_SPECIFIC_ACCESS_DENIED_ERROR`.
const ER_SPECIFIC_ACCESS_DENIED_ERROR: &str = "1227";

fn is_access_denied(db_err: &dyn sqlx::error::DatabaseError) -> bool {
    db_err.code().as_deref() == Some(ER_SPECIFIC_ACCESS_DENIED_ERROR)
}

/// A recoverable anomaly raised by [`crate::stats::Stats::add`].
///
/// Non-fatal: the caller logs it at informational severity and keeps going.
#[derive(Debug, Error)]
#[error(
    "value lap: penultimate(ts={penu_ts}, val={penu_val}) previous(ts={prev_ts}, val={prev_val}) current(ts={cur_ts}, val={cur_val})"
)]
pub struct ValueLap {
    pub penu_ts: i64,
    pub penu_val: f64,
    pub prev_ts: i64,
    pub prev_val: f64,
    pub cur_ts: i64,
    pub cur_val: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_classify_as_network() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let classified = CollectError::classify(sqlx::Error::Io(io));
        assert!(matches!(classified, CollectError::Network(_)));
    }

    #[test]
    fn unrelated_database_errors_do_not_trigger_reconnect() {
        // RowNotFound is a stand-in for "some non-transport sqlx error"; it
        // must not be mistaken for a dead connection.
        let classified = CollectError::classify(sqlx::Error::RowNotFound);
        assert!(matches!(classified, CollectError::Other(_)));
    }
}
