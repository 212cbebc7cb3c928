//! Mount configuration.
//!
//! Configs are RON files. A mount entry looks like:
//!
//! ```ron
//! (
//!     source: "/Users/amy/src/project",
//!     target: "project",          // relative to the guest user's home
//!     uid_map: { 501: 1000 },
//!     gid_map: { 20: 1000 },
//! )
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use crate::transfer::{IdMap, IdentityMaps};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("no config directory on this platform")]
    NoConfigDir,
}

/// One host directory to expose in the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Host directory.
    pub source: String,
    /// Guest path; relative paths are taken from the guest user's home.
    pub target: String,
    /// Guest uid → host uid.
    #[serde(default)]
    pub uid_map: IdMap,
    /// Guest gid → host gid.
    #[serde(default)]
    pub gid_map: IdMap,
}

impl MountConfig {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            uid_map: HashMap::new(),
            gid_map: HashMap::new(),
        }
    }

    /// Parse and validate a RON mount entry.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = parse_ron(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.is_empty() {
            return Err(ConfigError::Invalid("source must not be empty".into()));
        }
        if self.target.is_empty() {
            return Err(ConfigError::Invalid("target must not be empty".into()));
        }
        Ok(())
    }

    pub fn identity_maps(&self) -> IdentityMaps {
        IdentityMaps {
            uid_map: self.uid_map.clone(),
            gid_map: self.gid_map.clone(),
        }
    }
}

/// Parse RON text into any config type.
pub fn parse_ron<T: DeserializeOwned>(text: &str) -> Result<T, ConfigError> {
    Ok(ron::from_str(text)?)
}

/// Read and parse a RON config file.
pub fn load_ron<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_ron(&text)
}

/// `<config dir>/vmmount/config.ron`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoConfigDir)
}
