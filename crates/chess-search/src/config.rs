//! Engine configuration loaded from TOML.
//!
//! Every field has a default, so a configuration file only needs the
//! settings it changes. Out-of-range values are clamped by
//! [`EngineConfig::validate`], which [`EngineConfig::load`] and
//! [`EngineConfig::from_toml_str`] always apply.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or has fields of the wrong type.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

const MAX_THREADS: usize = 256;
const MAX_MULTI_PV: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Search threads including the master.
    pub threads: usize,
    /// Transposition table size in MiB.
    pub hash_mb: usize,
    /// Number of root lines searched and reported.
    pub multi_pv: usize,
    /// Initial aspiration half-width in centipawns.
    pub aspiration_window: i32,
    /// Failed aspiration searches before falling back to a full window.
    pub aspiration_max_failures: u32,
    pub max_quiescence_depth: i32,
    /// Generate quiet checking moves at the first quiescence ply.
    pub quiet_checks: bool,
    /// Time kept back per move for communication delays.
    pub move_overhead_ms: u64,
    /// Time never touched on the clock.
    pub emergency_time_ms: u64,
    /// No per-depth info lines before this much time has passed.
    pub info_interval_ms: u64,
    pub chess960: bool,
    /// Allow searches on the opponent's time. When off, a ponder request is
    /// searched as a normal one.
    pub ponder: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            threads: 1,
            hash_mb: 16,
            multi_pv: 1,
            aspiration_window: 25,
            aspiration_max_failures: 4,
            max_quiescence_depth: 12,
            quiet_checks: true,
            move_overhead_ms: 30,
            emergency_time_ms: 100,
            info_interval_ms: 200,
            chess960: false,
            ponder: false,
        }
    }
}

impl EngineConfig {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not a valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: EngineConfig = toml::from_str(content)?;
        config.validate();
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Clamps out-of-range settings, warning about each one changed.
    pub fn validate(&mut self) {
        if self.threads == 0 || self.threads > MAX_THREADS {
            let threads = self.threads.clamp(1, MAX_THREADS);
            warn!(requested = self.threads, using = threads, "threads out of range");
            self.threads = threads;
        }
        if self.hash_mb == 0 {
            warn!("hash size of 0 MiB requested, using 1 MiB");
            self.hash_mb = 1;
        }
        if self.multi_pv == 0 || self.multi_pv > MAX_MULTI_PV {
            let multi_pv = self.multi_pv.clamp(1, MAX_MULTI_PV);
            warn!(requested = self.multi_pv, using = multi_pv, "multi_pv out of range");
            self.multi_pv = multi_pv;
        }
        if self.aspiration_window <= 0 {
            warn!(requested = self.aspiration_window, "aspiration window must be positive, using 1");
            self.aspiration_window = 1;
        }
        if self.max_quiescence_depth < 1 {
            warn!(requested = self.max_quiescence_depth, "quiescence depth must be positive, using 1");
            self.max_quiescence_depth = 1;
        }
    }

    pub fn move_overhead(&self) -> Duration {
        Duration::from_millis(self.move_overhead_ms)
    }

    pub fn emergency_time(&self) -> Duration {
        Duration::from_millis(self.emergency_time_ms)
    }

    pub fn info_interval(&self) -> Duration {
        Duration::from_millis(self.info_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_config() {
        let config = EngineConfig::from_toml_str(
            r#"
threads = 4
hash_mb = 128
chess960 = true
"#,
        )
        .unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.hash_mb, 128);
        assert!(config.chess960);
        assert_eq!(config.multi_pv, 1);
        assert_eq!(config.info_interval(), Duration::from_millis(200));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = EngineConfig::from_toml_str(
            r#"
threads = 0
hash_mb = 0
multi_pv = 1000
aspiration_window = -5
"#,
        )
        .unwrap();
        assert_eq!(config.threads, 1);
        assert_eq!(config.hash_mb, 1);
        assert_eq!(config.multi_pv, MAX_MULTI_PV);
        assert_eq!(config.aspiration_window, 1);
    }

    #[test]
    fn wrong_type_is_a_parse_error() {
        let result = EngineConfig::from_toml_str("threads = \"many\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = EngineConfig::load("/nonexistent/engine.toml");
        match result {
            Err(ConfigError::Read { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/engine.toml"));
            }
            other => panic!("expected read error, got {:?}", other),
        }
    }

    #[test]
    fn serialization_roundtrip() {
        let config = EngineConfig {
            threads: 3,
            ponder: true,
            ..Default::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }
}
