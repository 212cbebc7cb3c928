//! Mount error types.

use std::io;
use thiserror::Error;

use crate::session::SessionError;

/// Errors raised while establishing a mount.
///
/// Every variant propagates straight out of [`SshfsMount::new`]; nothing is
/// retried and partially created guest directories are left in place.
///
/// [`SshfsMount::new`]: crate::SshfsMount::new
#[derive(Debug, Error)]
pub enum MountError {
    /// A remote command exited non-zero.
    #[error("remote command `{command}` failed: {stderr}")]
    RemoteCommandFailed { command: String, stderr: String },

    /// The transfer tool is not installed on the guest.
    #[error("'{tool}' is not installed on the guest")]
    MissingDependency { tool: String },

    /// A remote command succeeded but its output had the wrong shape.
    #[error("unexpected output from `{command}`: {output:?}")]
    MalformedResponse { command: String, output: String },

    /// The mount target was the empty string.
    #[error("mount target must not be empty")]
    EmptyTarget,

    /// The session itself failed (connection lost, channel refused, ...).
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The serve thread could not be started.
    #[error("failed to start transfer server thread: {0}")]
    Spawn(#[from] io::Error),
}

impl MountError {
    /// Create a RemoteCommandFailed error.
    pub fn remote_command_failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::RemoteCommandFailed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a MissingDependency error.
    pub fn missing_dependency(tool: impl Into<String>) -> Self {
        Self::MissingDependency { tool: tool.into() }
    }

    /// Create a MalformedResponse error.
    pub fn malformed_response(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::MalformedResponse {
            command: command.into(),
            output: output.into(),
        }
    }
}

/// Mount result type.
pub type MountResult<T> = Result<T, MountError>;
