use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

use super::Domain;

/// A domain persisted after an inspection, for the drop diff of a later run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    /// Hash of the configuration that produced the domain.
    pub config_hash: String,

    pub taken_at: DateTime<Utc>,

    pub domain: Domain,
}

impl DomainSnapshot {
    pub fn new(config_hash: impl Into<String>, domain: Domain) -> Self {
        Self {
            config_hash: config_hash.into(),
            taken_at: Utc::now(),
            domain,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Warn when two snapshots come from different configurations.
    pub fn check_compatible(&self, other: &DomainSnapshot) -> bool {
        if self.config_hash != other.config_hash {
            warn!(
                "Snapshots were taken with different configurations ({} vs {})",
                self.config_hash, other.config_hash
            );
            return false;
        }
        true
    }
}
