//! Cache configuration, persisted as TOML.
//!
//! Every field has a default, so a partial (or empty) file is valid:
//!
//! ```toml
//! maxPathLength = 256
//! parallelStartup = true
//! notifyDuringFullRecalculation = false
//! importantThreshold = 64
//! ```

use crate::error::Result;
use camino::Utf8Path;
use modcache_core::MAX_PATH_LENGTH;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Longest rendered payload the host loader accepts, in bytes.
    pub max_path_length: usize,

    /// Build the caches of all collections in parallel on startup.
    pub parallel_startup: bool,

    /// Emit per-file notifications while a full recalculation runs.
    pub notify_during_full_recalculation: bool,

    /// Queued incremental jobs for one collection above which the queue
    /// replaces them with a single full recalculation.
    pub important_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_path_length: MAX_PATH_LENGTH,
            parallel_startup: true,
            notify_during_full_recalculation: false,
            important_threshold: 64,
        }
    }
}

impl CacheConfig {
    /// Load the configuration from a file.
    ///
    /// Returns `Ok(None)` if the file doesn't exist and `Err` if it exists
    /// but cannot be parsed.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    pub fn load(path: &Utf8Path) -> Result<Option<Self>> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path.as_std_path())?;
        Ok(Some(Self::from_toml_str(&contents)?))
    }

    /// Save the configuration to a file, creating parent directories if needed.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path.as_std_path(), contents)?;
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_path_length, 256);
        assert!(config.parallel_startup);
        assert!(!config.notify_during_full_recalculation);
        assert_eq!(config.important_threshold, 64);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = CacheConfig::from_toml_str("importantThreshold = 8\n").unwrap();
        assert_eq!(config.important_threshold, 8);
        assert_eq!(config.max_path_length, 256);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let path = root.join("nested").join("cache.toml");

        let config = CacheConfig {
            parallel_startup: false,
            max_path_length: 128,
            ..CacheConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = CacheConfig::load(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_nonexistent() {
        let temp = NamedTempFile::new().unwrap();
        let std_path = temp.path().with_extension("nonexistent");
        let path = Utf8Path::from_path(&std_path).unwrap();

        assert!(CacheConfig::load(path).unwrap().is_none());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"maxPathLength = \"long\"").unwrap();
        temp.flush().unwrap();

        let path = Utf8Path::from_path(temp.path()).unwrap();
        assert!(matches!(
            CacheConfig::load(path),
            Err(crate::error::Error::Config(_))
        ));
    }

    #[test]
    fn test_serialization_format() {
        let text = toml::to_string(&CacheConfig::default()).unwrap();
        assert!(text.contains("maxPathLength = 256"));
        assert!(text.contains("notifyDuringFullRecalculation = false"));
    }
}
