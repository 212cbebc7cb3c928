//! SSH client constants.

use std::time::Duration;

/// Default SSH port on the guest.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// SSH inactivity timeout.
pub const SSH_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// SSH keep-alive interval.
pub const SSH_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// SSH keep-alive max retries.
pub const SSH_KEEPALIVE_MAX: usize = 3;

/// Extended-data stream number carrying stderr.
pub const SSH_EXTENDED_DATA_STDERR: u32 = 1;
