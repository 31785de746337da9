use crate::cli::actions::Action;
use anyhow::{Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;

/// # Errors
///
/// Returns an error if a required argument is missing.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let dsn = SecretString::from(
        matches
            .get_one::<String>("dsn")
            .cloned()
            .ok_or_else(|| anyhow!("DSN is required. Please provide it using the --dsn flag."))?,
    );

    let sink_uri = SecretString::from(
        matches
            .get_one::<String>("sink-uri")
            .cloned()
            .ok_or_else(|| anyhow!("sink URI is required. Please provide it using the --sink-uri flag."))?,
    );

    let sink_database = matches
        .get_one::<String>("sink-database")
        .cloned()
        .unwrap_or_else(|| "mariadb_metrics".to_string());

    let innodb_filter = matches
        .get_one::<String>("innodb-filter")
        .cloned()
        .unwrap_or_else(|| "%".to_string());

    let sample_interval_secs = matches.get_one::<u64>("interval").copied().unwrap_or(10);
    let aggregation_interval_secs = matches
        .get_one::<i64>("aggregation-interval")
        .copied()
        .unwrap_or(60);

    let old_passwords = matches.get_flag("old-passwords");

    let log_filter = matches
        .get_one::<String>("log")
        .cloned()
        .unwrap_or_else(|| "info".to_string());

    Ok(Action::Run {
        dsn,
        sample_interval_secs,
        aggregation_interval_secs,
        sink_uri,
        sink_database,
        innodb_filter,
        old_passwords,
        log_filter,
    })
}
