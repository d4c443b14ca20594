//! Commit manager configuration.

/// Configuration for a [`crate::CommitManager`].
#[derive(Debug, Clone)]
pub struct CommitConfig {
    /// Whether a missing stream counter is created on first commit.
    ///
    /// When false, committing to a stream whose counter was never created
    /// fails with `StorageError::SequenceNotFound`.
    pub lazy_create_sequences: bool,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            lazy_create_sequences: true,
        }
    }
}

impl CommitConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether missing counters are created lazily.
    #[must_use]
    pub const fn lazy_create_sequences(mut self, value: bool) -> Self {
        self.lazy_create_sequences = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        assert!(CommitConfig::default().lazy_create_sequences);
    }

    #[test]
    fn builder_pattern() {
        let config = CommitConfig::new().lazy_create_sequences(false);
        assert!(!config.lazy_create_sequences);
    }
}
