pub mod run;

use secrecy::SecretString;

/// The single action this binary performs: run the collect-aggregate-sink
/// pipeline until shut down. Kept as an enum (rather than a bare struct) in
/// the teacher's style, so a future action can be added without reshaping
/// the dispatch boundary.
pub enum Action {
    Run {
        dsn: SecretString,
        sample_interval_secs: u64,
        aggregation_interval_secs: i64,
        sink_uri: SecretString,
        sink_database: String,
        innodb_filter: String,
        old_passwords: bool,
        log_filter: String,
    },
}
