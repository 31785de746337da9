//! One sampling pass: `SHOW STATUS` + `INFORMATION_SCHEMA.INNODB_METRICS`,
//! folded into a single [`Collection`].
//!
//! Ported from `mysqlCollector.go`'s `GetShowStatusMetrics` and
//! `GetInnoDBMetrics`. Both are best-effort: a status variable that fails to
//! parse is permanently dropped from `Config` (the original's
//! `delete(m.config.Status, statName)`); an access-denied InnoDB query
//! permanently clears the InnoDB filter rather than aborting the whole
//! sample.

use crate::collector::config::Config;
use crate::collector::connection::Connector;
use crate::error::CollectError;
use crate::stats::{Collection, Metric, MetricKind};
use tracing::warn;

/// Run one sampling pass at `ts` (unix seconds), returning every metric this
/// collector currently knows how to read.
///
/// # Errors
///
/// Returns an error only when the status query itself fails (a connection
/// problem); individual unparseable values or a denied InnoDB query are
/// handled in place and never surface here.
pub async fn sample(
    connector: &dyn Connector,
    config: &Config,
    ts: i64,
) -> Result<Collection, CollectError> {
    let mut collection = Collection::new(ts);

    collect_status(connector, config, &mut collection).await?;

    if !config.innodb_filter_is_empty() {
        collect_innodb(connector, config, &mut collection).await;
    }

    Ok(collection)
}

async fn collect_status(
    connector: &dyn Connector,
    config: &Config,
    collection: &mut Collection,
) -> Result<(), CollectError> {
    let rows = connector.query_status().await?;

    for row in rows {
        let Some(kind) = config.kind_for(&row.name) else {
            continue;
        };

        if row.value.is_empty() {
            // Some values aren't set when not applicable, e.g.
            // slave_heartbeat_period on a master.
            continue;
        }

        match row.value.parse::<f64>() {
            Ok(value) => collection
                .metrics
                .push(Metric::new(format!("mysql/{}", row.name), kind, value)),
            Err(_) => {
                warn!(status = row.name, value = row.value, "unparseable status value, dropping permanently");
                config.remove_status(&row.name);
            }
        }
    }

    Ok(())
}

async fn collect_innodb(connector: &dyn Connector, config: &Config, collection: &mut Collection) {
    match connector.query_innodb_metrics().await {
        Ok(rows) => {
            for row in rows {
                let kind = if row.metric_type == "value" {
                    MetricKind::Gauge
                } else {
                    MetricKind::Counter
                };
                let name = format!("mysql/innodb/{}/{}", row.subsystem, row.name);
                collection.metrics.push(Metric::new(name, kind, row.value));
            }
        }
        Err(CollectError::InnodbAccessDenied) => {
            warn!("InnoDB metrics access denied, disabling InnoDB collection for this session");
            config.clear_innodb_filter();
        }
        Err(err) => {
            warn!(error = %err, "InnoDB metrics query failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::connection::{InnodbMetricRow, StatusRow};
    use futures::future::BoxFuture;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockConnector {
        status_rows: Vec<StatusRow>,
        innodb_result: Mutex<Option<Result<Vec<InnodbMetricRow>, CollectError>>>,
    }

    impl Connector for MockConnector {
        fn connect(&self) -> BoxFuture<'_, Result<(), CollectError>> {
            Box::pin(async { Ok(()) })
        }

        fn close(&self) -> BoxFuture<'_, Result<(), CollectError>> {
            Box::pin(async { Ok(()) })
        }

        fn query_status(&self) -> BoxFuture<'_, Result<Vec<StatusRow>, CollectError>> {
            let rows = self.status_rows.clone();
            Box::pin(async move { Ok(rows) })
        }

        fn query_innodb_metrics(&self) -> BoxFuture<'_, Result<Vec<InnodbMetricRow>, CollectError>> {
            #[allow(clippy::unwrap_used)]
            let result = self.innodb_result.lock().unwrap().take();
            Box::pin(async move { result.unwrap_or_else(|| Ok(Vec::new())) })
        }
    }

    fn status_row(name: &str, value: &str) -> StatusRow {
        StatusRow {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used, clippy::indexing_slicing)]
    async fn parses_known_status_values() {
        let connector = MockConnector {
            status_rows: vec![status_row("threads_running", "3")],
            innodb_result: Mutex::new(Some(Ok(Vec::new()))),
        };
        let mut status = HashMap::new();
        status.insert("threads_running".to_string(), MetricKind::Gauge);
        let config = Config::new(status, vec!["%".to_string()]);

        let collection = sample(&connector, &config, 10).await.unwrap();
        assert_eq!(collection.metrics.len(), 1);
        assert_eq!(collection.metrics[0].name, "mysql/threads_running");
        assert_eq!(collection.metrics[0].value, 3.0);
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn unknown_status_name_is_skipped() {
        let connector = MockConnector {
            status_rows: vec![status_row("not_configured", "1")],
            innodb_result: Mutex::new(Some(Ok(Vec::new()))),
        };
        let config = Config::new(HashMap::new(), vec!["%".to_string()]);

        let collection = sample(&connector, &config, 10).await.unwrap();
        assert!(collection.metrics.is_empty());
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn empty_value_is_skipped_without_dropping_the_name() {
        let connector = MockConnector {
            status_rows: vec![status_row("slave_heartbeat_period", "")],
            innodb_result: Mutex::new(Some(Ok(Vec::new()))),
        };
        let mut status = HashMap::new();
        status.insert("slave_heartbeat_period".to_string(), MetricKind::Gauge);
        let config = Config::new(status, vec!["%".to_string()]);

        let collection = sample(&connector, &config, 10).await.unwrap();
        assert!(collection.metrics.is_empty());
        // Unlike an unparseable value, an empty value does not remove the
        // name from the configured map.
        assert!(config.kind_for("slave_heartbeat_period").is_some());
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn unparseable_value_is_dropped_permanently() {
        let connector = MockConnector {
            status_rows: vec![status_row("threads_running", "not-a-number")],
            innodb_result: Mutex::new(Some(Ok(Vec::new()))),
        };
        let mut status = HashMap::new();
        status.insert("threads_running".to_string(), MetricKind::Gauge);
        let config = Config::new(status, vec!["%".to_string()]);

        let collection = sample(&connector, &config, 10).await.unwrap();
        assert!(collection.metrics.is_empty());
        assert!(config.kind_for("threads_running").is_none());
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn innodb_access_denied_clears_filter() {
        let connector = MockConnector {
            status_rows: Vec::new(),
            innodb_result: Mutex::new(Some(Err(CollectError::InnodbAccessDenied))),
        };
        let config = Config::new(HashMap::new(), vec!["%".to_string()]);

        let collection = sample(&connector, &config, 10).await.unwrap();
        assert!(collection.metrics.is_empty());
        assert!(config.innodb_filter_is_empty());
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn innodb_value_type_is_gauge_else_counter() {
        let connector = MockConnector {
            status_rows: Vec::new(),
            innodb_result: Mutex::new(Some(Ok(vec![
                InnodbMetricRow {
                    name: "buffer_pool_size".to_string(),
                    subsystem: "server".to_string(),
                    metric_type: "value".to_string(),
                    value: 128.0,
                },
                InnodbMetricRow {
                    name: "os_data_reads".to_string(),
                    subsystem: "os".to_string(),
                    metric_type: "counter".to_string(),
                    value: 42.0,
                },
            ]))),
        };
        let config = Config::new(HashMap::new(), vec!["%".to_string()]);

        let collection = sample(&connector, &config, 10).await.unwrap();
        assert_eq!(collection.metrics.len(), 2);
        let gauge = collection
            .metrics
            .iter()
            .find(|m| m.name == "mysql/innodb/server/buffer_pool_size")
            .unwrap();
        assert_eq!(gauge.kind, MetricKind::Gauge);
        let counter = collection
            .metrics
            .iter()
            .find(|m| m.name == "mysql/innodb/os/os_data_reads")
            .unwrap();
        assert_eq!(counter.kind, MetricKind::Counter);
    }
}
