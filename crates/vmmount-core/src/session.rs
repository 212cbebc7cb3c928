//! Remote session capability.
//!
//! The mount never talks to the transport directly. It only needs something
//! that can run a shell command string on the guest and hand back the exit
//! status and captured output.

use thiserror::Error;

/// An established, authenticated channel to a single guest.
///
/// Implementations must accept arbitrary shell strings (including multi-line
/// scripts) and must tolerate many sequential commands on the same session.
/// The session is moved into the mount and from there into the transfer
/// server, so it has to be `Send`.
pub trait RemoteSession: Send + 'static {
    /// Run `command` to completion and return its captured result.
    ///
    /// A non-zero exit is *not* an error at this level; only transport
    /// failures are.
    fn exec(&mut self, command: &str) -> Result<RemoteProcess, SessionError>;
}

impl<S: RemoteSession + ?Sized> RemoteSession for Box<S> {
    fn exec(&mut self, command: &str) -> Result<RemoteProcess, SessionError> {
        (**self).exec(command)
    }
}

/// A completed remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteProcess {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

impl RemoteProcess {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Exit status reported by the guest. `-1` when none was reported.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn read_std_output(&self) -> &str {
        &self.stdout
    }

    pub fn read_std_error(&self) -> &str {
        &self.stderr
    }

    pub fn into_std_output(self) -> String {
        self.stdout
    }
}

/// Transport-level session failure.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("not connected")]
    NotConnected,
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("channel failed: {0}")]
    ChannelFailed(String),
    #[error("{0}")]
    Other(String),
}
