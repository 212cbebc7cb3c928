//! # vmmount-core
//!
//! Host-to-guest directory bridge: everything that happens around the
//! transfer server.
//!
//! A mount is built in one synchronous pass over an established remote
//! session:
//!
//! ```text
//! SshfsMount::new
//!     │
//!     ├── runner      which sshfs              (MissingDependency on failure)
//!     ├── guest_path  home dir, absolute path, existing prefix
//!     ├── provision   mkdir -p missing suffix, chown chain up to the root
//!     ├── identity    id -u / id -g            (default uid/gid)
//!     └── transfer    T::new(session, params) → serve thread → run()
//! ```
//!
//! The remote session and the transfer server are capabilities supplied by
//! the caller ([`RemoteSession`], [`TransferServer`]). This crate only
//! orchestrates them.

pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod guest_path;
pub mod identity;
pub mod mount;
pub mod provision;
pub mod runner;
pub mod session;
#[cfg(any(test, feature = "test-mock"))]
pub mod testing;
pub mod transfer;

pub use config::{ConfigError, MountConfig};
pub use error::{MountError, MountResult};
pub use guest_path::{GuestPath, absolute_path, existing_prefix, home_directory};
pub use identity::{DefaultIdentity, default_identity};
pub use mount::{MountState, SshfsMount};
pub use provision::{GuestOwner, assign_ownership, create_missing, ownership_chain, provision};
pub use runner::{check_sshfs_exists, run_cmd, run_cmd_with};
pub use session::{RemoteProcess, RemoteSession, SessionError};
pub use transfer::{IdMap, IdentityMaps, TransferParams, TransferServer};
