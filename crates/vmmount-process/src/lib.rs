//! # vmmount-process
//!
//! Child-process creation behind a replaceable policy.
//!
//! A [`ProcessSpec`] says *what* to run. A [`ProcessSpawner`] decides *how*:
//! the default [`UnsecuredSpawner`] applies the spec as-is, while confined
//! variants (sandboxing, platform profiles) can rewrite or refuse it. The
//! spawner is picked once at configuration time and injected as a
//! [`SharedSpawner`] wherever processes are created.
//!
//! ```ignore
//! let spawner = default_spawner();
//! let spec = CommandSpec::new("ssh").args(["-V"]);
//! let output = spawner.create_process(Box::new(spec))?
//!     .execute(PROCESS_TIMEOUT)
//!     .await?;
//! ```

pub mod constants;
pub mod error;
pub mod factory;
pub mod process;
pub mod spec;

pub use error::ProcessError;
pub use factory::{ProcessSpawner, SharedSpawner, UnsecuredSpawner, default_spawner};
pub use process::{Process, ProcessOutput};
pub use spec::{CommandSpec, ProcessSpec};
