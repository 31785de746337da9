use crate::cli::actions::Action;
use crate::collector::config::Config;
use crate::collector::connection::SqlxConnector;
use crate::collector::dsn::Dsn;
use crate::collector::Collector;
use crate::sink::MongoSink;
use crate::aggregator::Aggregator;
use anyhow::Result;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// Handle the run action: wire collector -> aggregator -> sink and drive the
/// pipeline until ctrl-c.
///
/// # Errors
///
/// Returns an error if the DSN is malformed or the sink can't be reached.
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Run {
            dsn,
            sample_interval_secs,
            aggregation_interval_secs,
            sink_uri,
            sink_database,
            innodb_filter,
            old_passwords,
            log_filter: _,
        } => {
            let dsn = Dsn::from_url(dsn.expose_secret(), old_passwords)?;
            info!(dsn = %dsn.redacted(), "starting collector");

            let connector = Arc::new(SqlxConnector::new(dsn.connection_string()?));
            let innodb: Vec<String> = innodb_filter
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            let config = Arc::new(Config::new(
                crate::collector::status_vars::default_status_map(),
                innodb,
            ));

            let sink = Arc::new(MongoSink::connect(sink_uri.expose_secret(), sink_database).await?);
            let aggregator = Aggregator::new(aggregation_interval_secs, sink);

            let collector = Collector::new(connector, config, Duration::from_secs(sample_interval_secs));

            let (tx, rx) = mpsc::channel(1);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            let aggregator_handle = tokio::spawn(async move { aggregator.run(rx).await });
            let collector_handle = tokio::spawn(async move { collector.run(tx, shutdown_rx).await });

            tokio::signal::ctrl_c().await?;
            info!("shutdown signal received");
            shutdown_tx.send(true)?;

            collector_handle.await?;
            aggregator_handle.await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn rejects_malformed_dsn() {
        let action = Action::Run {
            dsn: SecretString::from("not-a-url".to_string()),
            sample_interval_secs: 10,
            aggregation_interval_secs: 60,
            sink_uri: SecretString::from("mongodb://127.0.0.1:27017".to_string()),
            sink_database: "mariadb_metrics".to_string(),
            innodb_filter: "%".to_string(),
            old_passwords: false,
            log_filter: "info".to_string(),
        };

        assert!(handle(action).await.is_err());
    }
}
