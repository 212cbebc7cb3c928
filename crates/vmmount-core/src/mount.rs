//! Mount orchestration and lifecycle.
//!
//! [`SshfsMount::new`] runs the whole provisioning pipeline on the calling
//! thread and only then starts the serve thread. Either the mount comes back
//! running or nothing was started.
//!
//! ```text
//!   new() ──────────────► Running ──── stop() / drop ───► Stopped
//!   (fails: nothing          │                              (terminal)
//!    to tear down)           └── serve thread: T::run()
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::constants::SERVE_THREAD_NAME;
use crate::error::{MountError, MountResult};
use crate::guest_path::{GuestPath, absolute_path};
use crate::identity::{DefaultIdentity, default_identity};
use crate::provision::provision;
use crate::runner::check_sshfs_exists;
use crate::transfer::{IdentityMaps, TransferParams, TransferServer};

/// Lifecycle state of a constructed mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Running,
    Stopped,
}

/// A live host directory exported into the guest.
///
/// Owns the transfer server and the thread serving it. Dropping the mount
/// stops it, so no serve thread outlives this value.
pub struct SshfsMount<T: TransferServer> {
    server: Arc<T>,
    serve_thread: Option<JoinHandle<()>>,
    source: String,
    target: String,
    identity: DefaultIdentity,
    state: MountState,
}

impl<T: TransferServer> std::fmt::Debug for SshfsMount<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshfsMount")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("identity", &self.identity)
            .field("state", &self.state)
            .finish()
    }
}

impl<T: TransferServer> SshfsMount<T> {
    /// Prepare `target` on the guest and start serving `source` there.
    ///
    /// The session is consumed: it ends up inside the transfer server. Any
    /// failure is returned as-is; directories already created on the guest
    /// stay, and a retry will find them as part of the existing prefix.
    pub fn new(
        mut session: T::Session,
        source: &str,
        target: &str,
        maps: IdentityMaps,
    ) -> MountResult<Self> {
        if target.is_empty() {
            return Err(MountError::EmptyTarget);
        }
        debug!(source, guest_target = target, "establishing mount");

        check_sshfs_exists(&mut session)?;

        // Relative targets live under the guest user's home.
        let absolute = absolute_path(&mut session, target)?;
        let path = GuestPath::split(&mut session, absolute)?;
        debug!(
            absolute = %path.absolute,
            existing = %path.existing,
            missing = %path.missing,
            "resolved guest target"
        );

        provision(&mut session, &path)?;

        let identity = default_identity(&mut session)?;
        let params = TransferParams::new(source, path.absolute.clone(), maps, identity);
        let server = Arc::new(T::new(session, params));
        let serve_thread = spawn_serve_thread(Arc::clone(&server), &path.absolute)?;

        Ok(Self {
            server,
            serve_thread: Some(serve_thread),
            source: source.to_string(),
            target: path.absolute,
            identity,
            state: MountState::Running,
        })
    }

    /// Stop serving and wait for the serve thread to exit.
    ///
    /// Only the first call signals the server; later calls do nothing.
    pub fn stop(&mut self) {
        if self.state == MountState::Stopped {
            return;
        }

        self.server.stop();
        if let Some(handle) = self.serve_thread.take() {
            if handle.join().is_err() {
                error!(mount = %self.target, "transfer server thread panicked");
            }
        }

        self.state = MountState::Stopped;
        info!(source = %self.source, mount = %self.target, "mount stopped");
    }

    pub fn state(&self) -> MountState {
        self.state
    }

    /// True while the serve loop has not returned.
    pub fn is_serving(&self) -> bool {
        self.serve_thread
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Absolute guest path of the mount.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn default_identity(&self) -> DefaultIdentity {
        self.identity
    }

    pub fn server(&self) -> &T {
        &self.server
    }
}

impl<T: TransferServer> Drop for SshfsMount<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_serve_thread<T: TransferServer>(server: Arc<T>, target: &str) -> MountResult<JoinHandle<()>> {
    let target = target.to_string();
    let handle = thread::Builder::new()
        .name(SERVE_THREAD_NAME.into())
        .spawn(move || {
            info!(mount = %target, "Connected");
            server.run();
            info!(mount = %target, "Stopped");
        })?;
    Ok(handle)
}
