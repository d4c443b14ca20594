//! Configuration for the sync layer.

/// Configuration for collections.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum changes in one export batch. `None` exports everything.
    ///
    /// Batches are cut at commit boundaries, so a batch may exceed the limit
    /// when a single commit stamped more rows.
    pub max_changes_per_export: Option<usize>,
    /// Maximum number of stale import log entries dropped per confirmation.
    pub stale_scan_limit: usize,
    /// Whether exports skip rows that were imported from the same partner.
    pub suppress_import_echo: bool,
}

impl SyncConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            max_changes_per_export: None,
            stale_scan_limit: 1000,
            suppress_import_echo: true,
        }
    }

    /// Limits the number of changes per export batch.
    #[must_use]
    pub fn with_max_changes_per_export(mut self, max: usize) -> Self {
        self.max_changes_per_export = Some(max);
        self
    }

    /// Sets the stale import log scan limit.
    #[must_use]
    pub fn with_stale_scan_limit(mut self, limit: usize) -> Self {
        self.stale_scan_limit = limit;
        self
    }

    /// Enables or disables import echo suppression.
    #[must_use]
    pub fn with_suppress_import_echo(mut self, suppress: bool) -> Self {
        self.suppress_import_echo = suppress;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.max_changes_per_export, None);
        assert_eq!(config.stale_scan_limit, 1000);
        assert!(config.suppress_import_echo);
    }

    #[test]
    fn builder() {
        let config = SyncConfig::new()
            .with_max_changes_per_export(50)
            .with_stale_scan_limit(10)
            .with_suppress_import_echo(false);
        assert_eq!(config.max_changes_per_export, Some(50));
        assert_eq!(config.stale_scan_limit, 10);
        assert!(!config.suppress_import_echo);
    }
}
