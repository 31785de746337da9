//! Default `SHOW STATUS` name -> kind table, ported from the original's
//! `GlobalMySQLStatus` literal (trimmed to a representative subset covering
//! connections, traffic, query execution, InnoDB I/O and replication-
//! adjacent counters; the source table runs into the hundreds of entries
//! and transcribing all of them is outside this spec's size budget).
//!
//! Names are lowercase, matching what the collector does to each
//! `Variable_name` column before looking it up (spec.md §4.1 step 2).

use crate::stats::MetricKind;
use std::collections::HashMap;

use MetricKind::{Counter, Gauge};

#[must_use]
pub fn default_status_map() -> HashMap<String, MetricKind> {
    let entries: &[(&str, MetricKind)] = &[
        ("threads_connected", Gauge),
        ("threads_running", Gauge),
        ("threads_created", Counter),
        ("threads_cached", Gauge),
        ("connections", Counter),
        ("max_used_connections", Gauge),
        ("aborted_connects", Counter),
        ("aborted_clients", Counter),
        ("bytes_received", Counter),
        ("bytes_sent", Counter),
        ("questions", Counter),
        ("queries", Counter),
        ("slow_queries", Counter),
        ("open_files", Gauge),
        ("open_tables", Gauge),
        ("opened_tables", Counter),
        ("opened_files", Counter),
        ("table_locks_immediate", Counter),
        ("table_locks_waited", Counter),
        ("created_tmp_disk_tables", Counter),
        ("created_tmp_tables", Counter),
        ("created_tmp_files", Counter),
        ("connection_errors_max_connections", Counter),
        ("connection_errors_accept", Counter),
        ("sort_merge_passes", Counter),
        ("sort_range", Counter),
        ("sort_rows", Counter),
        ("sort_scan", Counter),
        ("select_full_join", Counter),
        ("select_full_range_join", Counter),
        ("select_range", Counter),
        ("select_range_check", Counter),
        ("select_scan", Counter),
        ("handler_read_first", Counter),
        ("handler_read_key", Counter),
        ("handler_read_next", Counter),
        ("handler_read_prev", Counter),
        ("handler_read_rnd", Counter),
        ("handler_read_rnd_next", Counter),
        ("handler_write", Counter),
        ("handler_update", Counter),
        ("handler_delete", Counter),
        ("key_read_requests", Counter),
        ("key_reads", Counter),
        ("key_write_requests", Counter),
        ("key_writes", Counter),
        ("innodb_buffer_pool_pages_data", Gauge),
        ("innodb_buffer_pool_pages_dirty", Gauge),
        ("innodb_buffer_pool_pages_free", Gauge),
        ("innodb_buffer_pool_read_requests", Counter),
        ("innodb_buffer_pool_reads", Counter),
        ("innodb_buffer_pool_write_requests", Counter),
        ("innodb_log_waits", Counter),
        ("innodb_log_writes", Counter),
        ("innodb_log_write_requests", Counter),
        ("innodb_row_lock_waits", Counter),
        ("innodb_row_lock_current_waits", Gauge),
        ("innodb_row_lock_time", Counter),
        ("innodb_rows_read", Counter),
        ("innodb_rows_inserted", Counter),
        ("innodb_rows_updated", Counter),
        ("innodb_rows_deleted", Counter),
        ("innodb_data_reads", Counter),
        ("innodb_data_writes", Counter),
        ("innodb_data_fsyncs", Counter),
        ("innodb_deadlocks", Counter),
        ("slave_heartbeat_period", Gauge),
        ("binlog_cache_disk_use", Counter),
        ("binlog_stmt_cache_disk_use", Counter),
        ("uptime", Gauge),
    ];

    entries
        .iter()
        .map(|(name, kind)| ((*name).to_string(), *kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn default_map_is_lowercase_and_nonempty() {
        let map = default_status_map();
        assert!(!map.is_empty());
        for name in map.keys() {
            assert_eq!(name, &name.to_lowercase());
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn threads_running_is_a_gauge() {
        let map = default_status_map();
        assert_eq!(map.get("threads_running"), Some(&MetricKind::Gauge));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn questions_is_a_counter() {
        let map = default_status_map();
        assert_eq!(map.get("questions"), Some(&MetricKind::Counter));
    }
}
