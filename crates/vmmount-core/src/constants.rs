//! Mount configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

/// Transfer tool that must be installed on the guest for the mount to work.
pub const SSHFS_TOOL: &str = "sshfs";

/// Name of the background thread that runs the transfer server.
pub const SERVE_THREAD_NAME: &str = "vmmount-sftp";

/// Guest path separator.
pub const GUEST_PATH_SEPARATOR: char = '/';

/// Directory under the user config dir that holds vmmount's files.
pub const CONFIG_DIR_NAME: &str = "vmmount";

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "config.ron";
