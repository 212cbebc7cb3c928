//! Remote command runner.
//!
//! Runs one command on the session, returns its stdout, and routes a
//! non-zero exit through an error handler. No retries: the first failure
//! is surfaced to the caller.

use tracing::{debug, warn};

use crate::commands;
use crate::constants::SSHFS_TOOL;
use crate::error::{MountError, MountResult};
use crate::session::{RemoteProcess, RemoteSession};

/// Run `command` and return its stdout, building the error with `on_error`
/// when the guest reports a non-zero exit.
///
/// The handler sees the completed process, so it can read stderr.
pub fn run_cmd_with<S, F>(session: &mut S, command: &str, on_error: F) -> MountResult<String>
where
    S: RemoteSession + ?Sized,
    F: FnOnce(&RemoteProcess) -> MountError,
{
    debug!(command, "running remote command");
    let process = session.exec(command)?;
    if !process.success() {
        debug!(
            command,
            exit_code = process.exit_code(),
            stderr = process.read_std_error(),
            "remote command failed"
        );
        return Err(on_error(&process));
    }
    Ok(process.into_std_output())
}

/// Run `command`, turning a non-zero exit into [`MountError::RemoteCommandFailed`]
/// carrying the captured stderr.
pub fn run_cmd<S>(session: &mut S, command: &str) -> MountResult<String>
where
    S: RemoteSession + ?Sized,
{
    run_cmd_with(session, command, |process| {
        MountError::remote_command_failed(command, process.read_std_error())
    })
}

/// Check that the transfer tool is installed on the guest.
pub fn check_sshfs_exists<S>(session: &mut S) -> MountResult<()>
where
    S: RemoteSession + ?Sized,
{
    run_cmd_with(session, &commands::which(SSHFS_TOOL), |process| {
        warn!(
            "Unable to determine if '{}' is installed: {}",
            SSHFS_TOOL,
            process.read_std_error()
        );
        MountError::missing_dependency(SSHFS_TOOL)
    })?;
    Ok(())
}
