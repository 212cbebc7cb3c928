//! SSH transport for vmmount.
//!
//! [`SshSession`] implements [`vmmount_core::RemoteSession`] on top of russh.
//! Each `exec` opens a fresh session channel, runs the command, and collects
//! stdout, stderr, and the exit status before returning.

pub mod config;
pub mod constants;
pub mod error;
pub mod session;

pub use config::SshConfig;
pub use error::SshError;
pub use session::SshSession;
