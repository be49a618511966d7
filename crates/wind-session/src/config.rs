//! Session configuration with optional YAML overrides.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use wind_cache::CacheConfig;
use wind_fetch::FetchConfig;
use wind_grid::DensityConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// All tunables of the overlay pipeline. Every field has an
/// empirical default; a YAML file overrides selectively.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Delay before a non-immediate refresh runs; newer requests
    /// supersede a pending one.
    pub refresh_debounce_ms: u64,
    pub density: DensityConfig,
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            refresh_debounce_ms: 320,
            density: DensityConfig::default(),
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl OverlayConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        info!(path = %path.display(), "loaded overlay config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_complete() {
        let config = OverlayConfig::default();
        assert_eq!(config.refresh_debounce_ms, 320);
        assert_eq!(config.cache.max_entries, 24);
        assert_eq!(config.fetch.max_retries, 4);
    }

    #[test]
    fn yaml_overrides_selectively() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "refresh_debounce_ms: 10").unwrap();
        writeln!(file, "fetch:").unwrap();
        writeln!(file, "  max_retries: 2").unwrap();

        let config = OverlayConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.refresh_debounce_ms, 10);
        assert_eq!(config.fetch.max_retries, 2);
        // Untouched sections keep their defaults.
        assert_eq!(config.cache.max_entries, 24);
    }
}
