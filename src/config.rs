//! Import job configuration.
//!
//! Validated once when a `NodesBuilder` is created. Can be persisted as
//! `import_config.json` next to the input so repeated imports of the
//! same source use the same settings.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::resource::TuningProfile;

pub const CONFIG_FILE_NAME: &str = "import_config.json";

/// Default number of nodes staged per lane before a flush.
pub const DEFAULT_BATCH_CAPACITY: usize = 10_000;

const DEFAULT_CONCURRENCY: usize = 4;

// ── Concurrency ────────────────────────────────────────────────────

/// Number of worker lanes and remap tasks. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Concurrency(NonZeroUsize);

impl Concurrency {
    pub const SINGLE: Concurrency = Concurrency(NonZeroUsize::MIN);

    pub fn new(value: usize) -> Result<Self> {
        NonZeroUsize::new(value)
            .map(Concurrency)
            .ok_or_else(|| GraphError::InvalidConfig("concurrency must be > 0".to_string()))
    }

    /// One lane per logical CPU.
    pub fn available_cores() -> Self {
        Concurrency(std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }

    pub fn value(&self) -> usize {
        self.0.get()
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Concurrency(NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl TryFrom<usize> for Concurrency {
    type Error = GraphError;

    fn try_from(value: usize) -> Result<Self> {
        Concurrency::new(value)
    }
}

impl From<Concurrency> for usize {
    fn from(c: Concurrency) -> usize {
        c.value()
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Provider mode ──────────────────────────────────────────────────

/// How `NodesBuilder::add_node` picks a local worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    /// Each calling thread is bound to one lane on first use.
    #[default]
    ThreadLocal,
    /// Workers are created on demand, up to `concurrency`, and borrowed
    /// per call.
    Pooled,
}

// ── Builder config ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodesBuilderConfig {
    /// Worker lanes and remap fan-out.
    pub concurrency: Concurrency,
    /// Nodes staged per lane before a flush.
    pub batch_capacity: usize,
    /// Skip original ids that were already added.
    pub deduplicate_ids: bool,
    /// Inclusive upper bound on original ids, if known. Sizes the
    /// dedup bit set; larger ids are rejected.
    pub max_original_id: Option<u64>,
    /// Record per-node labels in the id map.
    pub has_label_information: bool,
    /// Accept node properties.
    pub has_properties: bool,
    pub provider: ProviderMode,
}

impl Default for NodesBuilderConfig {
    fn default() -> Self {
        Self {
            concurrency: Concurrency::default(),
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            deduplicate_ids: false,
            max_original_id: None,
            has_label_information: true,
            has_properties: true,
            provider: ProviderMode::default(),
        }
    }
}

impl NodesBuilderConfig {
    /// Config sized for the host machine.
    pub fn from_profile(profile: &TuningProfile) -> Self {
        Self {
            concurrency: profile.concurrency,
            batch_capacity: profile.batch_capacity,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_capacity == 0 {
            return Err(GraphError::InvalidConfig(
                "batch_capacity must be > 0".to_string(),
            ));
        }
        if let Some(max) = self.max_original_id {
            if max > i64::MAX as u64 {
                return Err(GraphError::InvalidConfig(format!(
                    "max_original_id {max} exceeds 2^63 - 1"
                )));
            }
        }
        Ok(())
    }

    /// Read config from `dir`. Returns None if the file doesn't exist.
    pub fn read_from(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Write config to `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let path = dir.join(CONFIG_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let err = Concurrency::new(0).unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(Concurrency::new(3).unwrap().value(), 3);
        assert_eq!(Concurrency::SINGLE.value(), 1);
        assert!(Concurrency::available_cores().value() >= 1);
    }

    #[test]
    fn test_zero_batch_capacity_is_rejected() {
        let config = NodesBuilderConfig {
            batch_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(NodesBuilderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_max_original_id_above_63_bits_is_rejected() {
        let config = NodesBuilderConfig {
            max_original_id: Some(u64::MAX),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        assert!(NodesBuilderConfig::read_from(dir.path()).unwrap().is_none());

        let config = NodesBuilderConfig {
            concurrency: Concurrency::new(8).unwrap(),
            batch_capacity: 512,
            deduplicate_ids: true,
            max_original_id: Some(1_000_000),
            provider: ProviderMode::Pooled,
            ..Default::default()
        };
        config.write_to(dir.path()).unwrap();

        let loaded = NodesBuilderConfig::read_from(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"concurrency": 2, "provider": "pooled"}"#,
        )
        .unwrap();

        let loaded = NodesBuilderConfig::read_from(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.concurrency.value(), 2);
        assert_eq!(loaded.provider, ProviderMode::Pooled);
        assert_eq!(loaded.batch_capacity, DEFAULT_BATCH_CAPACITY);
    }

    #[test]
    fn test_zero_concurrency_in_file_fails_to_parse() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{"concurrency": 0}"#).unwrap();
        assert!(NodesBuilderConfig::read_from(dir.path()).is_err());
    }
}
