//! Process defaults.

use std::time::Duration;

/// Default upper bound for [`Process::execute`](crate::Process::execute).
pub const PROCESS_TIMEOUT: Duration = Duration::from_secs(30);
