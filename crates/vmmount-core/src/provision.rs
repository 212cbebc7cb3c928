//! Guest directory provisioning.
//!
//! Creates the missing part of a mount target below its existing prefix and
//! hands the whole chain, existing root included, to the session user.
//!
//! Creation runs under `sudo`, so without the ownership walk the new
//! directories would belong to root and be unusable by the identity the
//! transfer server operates as.
//!
//! ```text
//! root     = /home/ubuntu/          (exists)
//! missing  = work/src
//!
//! mkdir    cd "/home/ubuntu/" && sudo mkdir -p "work/src"
//! chown    /home/ubuntu/work/src
//!          /home/ubuntu/work
//!          /home/ubuntu/            ← pre-existing root is re-owned too
//! ```

use tracing::{debug, info};

use crate::commands;
use crate::constants::GUEST_PATH_SEPARATOR;
use crate::error::MountResult;
use crate::guest_path::GuestPath;
use crate::runner::run_cmd;
use crate::session::RemoteSession;

/// User and group names of the session identity on the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestOwner {
    pub user: String,
    pub group: String,
}

impl GuestOwner {
    /// Ask the guest who the session user is.
    pub fn discover<S>(session: &mut S) -> MountResult<Self>
    where
        S: RemoteSession + ?Sized,
    {
        let user = run_cmd(session, &commands::user_name())?;
        let group = run_cmd(session, &commands::group_name())?;
        Ok(Self {
            user: user.trim_end().to_string(),
            group: group.trim_end().to_string(),
        })
    }
}

/// Create `missing` below `root`. Does nothing when `missing` is empty.
pub fn create_missing<S>(session: &mut S, root: &str, missing: &str) -> MountResult<()>
where
    S: RemoteSession + ?Sized,
{
    if missing.is_empty() {
        return Ok(());
    }
    info!(root, missing, "creating missing guest directories");
    run_cmd(session, &commands::make_dirs(root, missing))?;
    Ok(())
}

/// Give every directory from `root + target` back up to `root` to the
/// session user.
pub fn assign_ownership<S>(session: &mut S, root: &str, target: &str) -> MountResult<GuestOwner>
where
    S: RemoteSession + ?Sized,
{
    let owner = GuestOwner::discover(session)?;
    for path in ownership_chain(root, target) {
        debug!(path = %path, user = %owner.user, group = %owner.group, "chown");
        run_cmd(session, &commands::chown(&owner.user, &owner.group, &path))?;
    }
    Ok(owner)
}

/// Create and re-own everything `path` is missing.
///
/// Runs the ownership walk even when nothing was created, so an already
/// provisioned target still gets its root chowned.
pub fn provision<S>(session: &mut S, path: &GuestPath) -> MountResult<GuestOwner>
where
    S: RemoteSession + ?Sized,
{
    create_missing(session, &path.existing, &path.missing)?;
    assign_ownership(session, &path.existing, &path.missing)
}

/// Paths to chown for `target` below `root`, leaf first, root last.
///
/// `n` non-empty segments in `target` give `n + 1` paths, each strictly
/// shorter than the one before. The root is returned exactly as given.
pub fn ownership_chain(root: &str, target: &str) -> Vec<String> {
    let segments: Vec<&str> = target
        .split(GUEST_PATH_SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect();

    let base = root.trim_end_matches(GUEST_PATH_SEPARATOR);
    let mut chain: Vec<String> = (1..=segments.len())
        .rev()
        .map(|depth| format!("{base}/{}", segments[..depth].join("/")))
        .collect();
    chain.push(root.to_string());
    chain
}
