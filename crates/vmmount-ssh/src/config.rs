//! SSH connection configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SSH_PORT;

/// SSH connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    /// Private key file. When unset, keys are taken from the SSH agent.
    #[serde(default)]
    pub key_path: Option<String>,
    /// Expected `SHA256:` fingerprint of the guest host key. When unset any
    /// key is accepted with a warning.
    #[serde(default)]
    pub host_key_fingerprint: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_username() -> String {
    whoami::username()
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_SSH_PORT,
            username: default_username(),
            key_path: None,
            host_key_fingerprint: None,
        }
    }
}

impl SshConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    /// Key path with `~` and environment variables expanded.
    pub fn expanded_key_path(&self) -> Option<PathBuf> {
        self.key_path.as_deref().map(|path| {
            let expanded = shellexpand::full(path)
                .map(|p| p.into_owned())
                .unwrap_or_else(|_| path.to_string());
            PathBuf::from(expanded)
        })
    }

    /// Does `actual` (as printed by russh, `SHA256:...`) satisfy the pin?
    ///
    /// The `SHA256:` prefix is optional in the configured value.
    pub fn host_key_matches(&self, actual: &str) -> bool {
        match self.host_key_fingerprint.as_deref() {
            None => true,
            Some(expected) => {
                let strip = |s: &str| s.trim().trim_start_matches("SHA256:").to_string();
                strip(expected) == strip(actual)
            }
        }
    }
}
