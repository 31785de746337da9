//! Mutable collector configuration: the `SHOW STATUS` name -> kind map and
//! the InnoDB subsystem filter.
//!
//! Ported from `src/mysqlCollector/config.go` (`Config{Status, InnoDB}`).
//! Both fields can shrink at runtime (an unparseable status name is removed
//! permanently; an access-denied InnoDB query clears the filter entirely),
//! so they're held behind [`arc_swap::ArcSwap`] rather than in a plain
//! struct field — this is the "small mutable-config interface" spec.md §9
//! asks for instead of global mutable state.

use crate::stats::MetricKind;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

/// Collector configuration: which `SHOW STATUS` variables to collect (and
/// as which kind), and which InnoDB subsystems to query.
pub struct Config {
    status: ArcSwap<HashMap<String, MetricKind>>,
    innodb_filter: ArcSwap<Vec<String>>,
}

impl Config {
    #[must_use]
    pub fn new(status: HashMap<String, MetricKind>, innodb_filter: Vec<String>) -> Self {
        Self {
            status: ArcSwap::from_pointee(status),
            innodb_filter: ArcSwap::from_pointee(innodb_filter),
        }
    }

    /// Default configuration: [`crate::collector::status_vars::default_status_map`]
    /// and an InnoDB filter of `["%"]` (all enabled subsystems).
    #[must_use]
    pub fn default_config() -> Self {
        Self::new(super::status_vars::default_status_map(), vec!["%".to_string()])
    }

    #[must_use]
    pub fn kind_for(&self, status_name: &str) -> Option<MetricKind> {
        self.status.load().get(status_name).copied()
    }

    /// Permanently stop collecting `status_name` (it failed to parse).
    pub fn remove_status(&self, status_name: &str) {
        let current = self.status.load();
        if !current.contains_key(status_name) {
            return;
        }
        let mut next = (**current).clone();
        next.remove(status_name);
        self.status.store(Arc::new(next));
    }

    #[must_use]
    pub fn innodb_filter_is_empty(&self) -> bool {
        self.innodb_filter.load().is_empty()
    }

    /// Permanently disable InnoDB metric collection for this session (access
    /// denied).
    pub fn clear_innodb_filter(&self) {
        self.innodb_filter.store(Arc::new(Vec::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn remove_status_is_idempotent() {
        let mut m = HashMap::new();
        m.insert("threads_running".to_string(), MetricKind::Gauge);
        let cfg = Config::new(m, vec!["%".to_string()]);

        assert!(cfg.kind_for("threads_running").is_some());
        cfg.remove_status("threads_running");
        assert!(cfg.kind_for("threads_running").is_none());
        cfg.remove_status("threads_running"); // no panic, no-op
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn clear_innodb_filter_empties_it() {
        let cfg = Config::new(HashMap::new(), vec!["%".to_string()]);
        assert!(!cfg.innodb_filter_is_empty());
        cfg.clear_innodb_filter();
        assert!(cfg.innodb_filter_is_empty());
    }
}
