//! Configuration for ConstKV
//!
//! Writer settings with sensible defaults.

use crate::storage::MAX_OFFSET;

/// Configuration for building a database
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Buffering
    // -------------------------------------------------------------------------
    /// Capacity of the writer's internal buffer (in bytes)
    pub buffer_capacity: usize,

    // -------------------------------------------------------------------------
    // Limits
    // -------------------------------------------------------------------------
    /// Highest file offset the writer may reach.
    /// Never above `u32::MAX`; offsets are stored as u32 on disk.
    pub size_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_capacity: 64 * 1024, // 64 KB
            size_limit: MAX_OFFSET,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the writer buffer capacity (in bytes)
    pub fn buffer_capacity(mut self, bytes: usize) -> Self {
        self.config.buffer_capacity = bytes;
        self
    }

    /// Set the maximum database size (in bytes)
    pub fn size_limit(mut self, bytes: u32) -> Self {
        self.config.size_limit = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limit_is_u32_max() {
        let config = Config::default();
        assert_eq!(config.size_limit, u32::MAX);
        assert_eq!(config.buffer_capacity, 64 * 1024);
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::builder()
            .buffer_capacity(128)
            .size_limit(4096)
            .build();

        assert_eq!(config.buffer_capacity, 128);
        assert_eq!(config.size_limit, 4096);
    }
}
