//! Configuration for the in-memory entity store.

use wonka::SAMPLE_PREFIX;

/// Configuration for [`MemoryEntityStore`](crate::MemoryEntityStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name prefix whose enrolled keys may be replaced.
    ///
    /// Default: `sample`
    pub sample_prefix: String,

    /// Maximum number of enrolled entities.
    ///
    /// Default: 100,000
    pub max_entities: usize,

    /// Whether an update may replace the key of a non-sample entity.
    ///
    /// Default: false
    pub allow_rekey: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sample_prefix: SAMPLE_PREFIX.to_string(),
            max_entities: 100_000,
            allow_rekey: false,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sample prefix.
    #[must_use]
    pub fn with_sample_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sample_prefix = prefix.into();
        self
    }

    /// Sets the maximum number of entities.
    #[must_use]
    pub const fn with_max_entities(mut self, max: usize) -> Self {
        self.max_entities = max;
        self
    }

    /// Allows or forbids replacing enrolled keys.
    #[must_use]
    pub const fn with_allow_rekey(mut self, allow: bool) -> Self {
        self.allow_rekey = allow;
        self
    }

    /// Returns true if `name` falls in the sample namespace.
    #[must_use]
    pub fn is_sample(&self, name: &str) -> bool {
        name.get(..self.sample_prefix.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&self.sample_prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.sample_prefix, "sample");
        assert_eq!(config.max_entities, 100_000);
        assert!(!config.allow_rekey);
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new()
            .with_sample_prefix("test")
            .with_max_entities(2)
            .with_allow_rekey(true);

        assert_eq!(config.sample_prefix, "test");
        assert_eq!(config.max_entities, 2);
        assert!(config.allow_rekey);
    }

    #[test]
    fn sample_prefix_ignores_case() {
        let config = StoreConfig::default();
        assert!(config.is_sample("sample-svc"));
        assert!(config.is_sample("SAMPLE"));
        assert!(!config.is_sample("samp"));
        assert!(!config.is_sample("svc-sample"));
    }
}
