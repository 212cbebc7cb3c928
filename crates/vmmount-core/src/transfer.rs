//! Transfer server capability.
//!
//! The server that actually answers filesystem requests for the mounted path
//! lives outside this crate. The mount constructs it once provisioning is
//! done, then drives it from a dedicated thread.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identity::DefaultIdentity;
use crate::session::RemoteSession;

/// Guest numeric id → host numeric id.
pub type IdMap = HashMap<u32, u32>;

/// User and group translation tables for ownership crossing the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMaps {
    #[serde(default)]
    pub uid_map: IdMap,
    #[serde(default)]
    pub gid_map: IdMap,
}

/// Everything the transfer server needs besides the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferParams {
    /// Host directory being exported.
    pub source: String,
    /// Absolute guest path it appears at.
    pub target: String,
    pub gid_map: IdMap,
    pub uid_map: IdMap,
    pub default_uid: u32,
    pub default_gid: u32,
}

impl TransferParams {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        maps: IdentityMaps,
        identity: DefaultIdentity,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            gid_map: maps.gid_map,
            uid_map: maps.uid_map,
            default_uid: identity.uid,
            default_gid: identity.gid,
        }
    }
}

/// A filesystem server bound to one session.
///
/// `run` blocks for the lifetime of the mount; `stop` is called from another
/// thread and must make `run` return.
pub trait TransferServer: Send + Sync + Sized + 'static {
    /// Session type the server speaks over.
    type Session: RemoteSession;

    /// Take ownership of `session` and prepare to serve `params.source` at
    /// `params.target`.
    fn new(session: Self::Session, params: TransferParams) -> Self;

    /// Serve until stopped.
    fn run(&self);

    /// Ask `run` to return.
    fn stop(&self);
}
