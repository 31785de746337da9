#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use mariadb_metricsd::collector::config::Config;
use mariadb_metricsd::collector::connection::{Connector, SqlxConnector};
use mariadb_metricsd::collector::{sample, status_vars};
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;
use testcontainers_modules::mariadb::Mariadb;
use testcontainers_modules::testcontainers::{ImageExt, core::IntoContainerPort, runners::AsyncRunner};
use tokio::time::sleep;

/// Sample a real MariaDB container end to end: connect, `SHOW STATUS`,
/// `INFORMATION_SCHEMA.INNODB_METRICS`, and confirm both surfaces produce
/// metrics the default configuration understands.
#[tokio::test]
async fn samples_real_mariadb_container() -> anyhow::Result<()> {
    let Some(docker_host) = common::find_container_runtime() else {
        eprintln!("no container runtime socket found, skipping container integration test");
        return Ok(());
    };
    // Safe: we control the value and it stays ASCII for child processes.
    unsafe { std::env::set_var("DOCKER_HOST", &docker_host) };

    let container = match Mariadb::default()
        .with_env_var("MARIADB_ROOT_PASSWORD", "root")
        .with_env_var("MARIADB_ROOT_HOST", "%")
        .start()
        .await
    {
        Ok(container) => container,
        Err(e) => {
            eprintln!("skipping container integration test: {e}");
            return Ok(());
        }
    };

    let port = container.get_host_port_ipv4(3306.tcp()).await?;
    let host = container.get_host().await?.to_string();
    let dsn = format!("mysql://root:root@{host}:{port}/mysql");

    // Give the container a moment past the port becoming available.
    for _ in 0..10 {
        if MySqlPoolOptions::new().connect(&dsn).await.is_ok() {
            break;
        }
        sleep(Duration::from_millis(500)).await;
    }

    let connector = SqlxConnector::new(dsn);
    connector.connect().await.expect("should connect to the test container");

    let config = Config::new(status_vars::default_status_map(), vec!["%".to_string()]);
    let collection = sample::sample(&connector, &config, 0)
        .await
        .expect("sampling should succeed");

    assert!(
        collection.metrics.iter().any(|m| m.name == "mysql/threads_connected"),
        "expected mysql/threads_connected among sampled status metrics"
    );

    connector.close().await.ok();
    Ok(())
}
