//! SSH error types.

use vmmount_core::SessionError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SshError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Auth failed: {0}")]
    AuthFailed(String),
    #[error("Channel failed: {0}")]
    ChannelFailed(String),
    #[error("SSH agent error: {0}")]
    AgentFailed(String),
    #[error("No SSH keys available in agent")]
    NoKeysAvailable,
    #[error("Failed to load key {path}: {reason}")]
    KeyLoad { path: String, reason: String },
    #[error("Host key mismatch: expected {expected}, got {actual}")]
    HostKeyMismatch { expected: String, actual: String },
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("Disconnected")]
    Disconnected,
}

impl From<russh::Error> for SshError {
    fn from(e: russh::Error) -> Self {
        SshError::ConnectionFailed(e.to_string())
    }
}

impl From<SshError> for SessionError {
    fn from(e: SshError) -> Self {
        match e {
            SshError::Disconnected => SessionError::NotConnected,
            SshError::ConnectionFailed(msg) => SessionError::ConnectionLost(msg),
            SshError::ChannelFailed(msg) => SessionError::ChannelFailed(msg),
            other => SessionError::Other(other.to_string()),
        }
    }
}
