//! `vmmount` configuration file.
//!
//! ```ron
//! (
//!     ssh: (host: "192.168.64.3", username: "ubuntu"),
//!     mount: (source: "/Users/amy/src", target: "src"),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use vmmount_core::config::{default_config_path, load_ron};
use vmmount_core::{ConfigError, MountConfig};
use vmmount_ssh::SshConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmmountConfig {
    #[serde(default)]
    pub ssh: SshConfig,
    pub mount: MountConfig,
}

impl VmmountConfig {
    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = match path {
            Some(path) => load_ron(path)?,
            None => load_ron(&default_config_path()?)?,
        };
        config.mount.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(
                ssh: (host: "192.168.64.3", port: 2222, username: "ubuntu"),
                mount: (source: "/Users/amy/src", target: "src", uid_map: {{ 501: 1000 }}),
            )"#
        )
        .unwrap();

        let config = VmmountConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.ssh.host, "192.168.64.3");
        assert_eq!(config.ssh.port, 2222);
        assert_eq!(config.mount.target, "src");
        assert_eq!(config.mount.uid_map.get(&501), Some(&1000));
    }

    #[test]
    fn test_ssh_section_optional() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"(mount: (source: "/a", target: "b"))"#).unwrap();

        let config = VmmountConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.ssh, SshConfig::default());
    }

    #[test]
    fn test_empty_target_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"(mount: (source: "/a", target: ""))"#).unwrap();

        let err = VmmountConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
