use anyhow::Result;
use mariadb_metricsd::cli::{actions::run, commands, dispatch};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = commands::new().get_matches();

    let log_filter = matches
        .get_one::<String>("log")
        .cloned()
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let action = dispatch::handler(&matches)?;
    run::handle(action).await
}
