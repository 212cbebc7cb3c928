//! Default identity discovery.

use tracing::debug;

use crate::commands;
use crate::error::{MountError, MountResult};
use crate::runner::run_cmd;
use crate::session::RemoteSession;

/// Numeric uid/gid of the session user on the guest.
///
/// The transfer server falls back to these when a file's owner has no entry
/// in the identity maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefaultIdentity {
    pub uid: u32,
    pub gid: u32,
}

/// Run `id -u` and `id -g` on the guest.
pub fn default_identity<S>(session: &mut S) -> MountResult<DefaultIdentity>
where
    S: RemoteSession + ?Sized,
{
    let uid = query_id(session, &commands::user_id())?;
    let gid = query_id(session, &commands::group_id())?;
    Ok(DefaultIdentity { uid, gid })
}

fn query_id<S>(session: &mut S, command: &str) -> MountResult<u32>
where
    S: RemoteSession + ?Sized,
{
    let output = run_cmd(session, command)?;
    debug!(command, output = output.trim_end(), "identity query");
    output
        .trim()
        .parse::<u32>()
        .map_err(|_| MountError::malformed_response(command, output))
}
