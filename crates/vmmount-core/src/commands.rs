//! Remote command templates.
//!
//! Every shell string the mount sends to the guest is built here, one
//! function per command shape. Test doubles match on these exact strings.

/// Probe for the transfer tool.
pub fn which(tool: &str) -> String {
    format!("which {tool}")
}

/// Print the session user's home directory.
pub fn home_dir() -> String {
    "bash -c 'echo ${HOME}'".to_string()
}

/// Strip trailing segments off `path` until an existing directory is found,
/// then print it with a trailing separator.
pub fn existing_dirs(path: &str) -> String {
    format!(
        "/bin/bash -c 'P=\"{path}\"; while [ ! -d \"$P/\" ]; do P=${{P%/*}}; done; echo $P/'"
    )
}

/// Create `missing` below `root` with elevated privilege.
pub fn make_dirs(root: &str, missing: &str) -> String {
    format!("cd \"{root}\" && sudo mkdir -p \"{missing}\"")
}

pub fn user_name() -> String {
    "id -nu".to_string()
}

pub fn group_name() -> String {
    "id -ng".to_string()
}

pub fn user_id() -> String {
    "id -u".to_string()
}

pub fn group_id() -> String {
    "id -g".to_string()
}

/// Hand one directory over to `user:group`.
pub fn chown(user: &str, group: &str, path: &str) -> String {
    format!("sudo chown {user}:{group} \"{path}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_dirs_script() {
        assert_eq!(
            existing_dirs("/home/ubuntu/work"),
            "/bin/bash -c 'P=\"/home/ubuntu/work\"; while [ ! -d \"$P/\" ]; do P=${P%/*}; done; echo $P/'"
        );
    }

    #[test]
    fn test_make_dirs_quotes_both_paths() {
        assert_eq!(
            make_dirs("/home/ubuntu/", "a b/c"),
            "cd \"/home/ubuntu/\" && sudo mkdir -p \"a b/c\""
        );
    }

    #[test]
    fn test_chown() {
        assert_eq!(
            chown("ubuntu", "adm", "/home/ubuntu/work"),
            "sudo chown ubuntu:adm \"/home/ubuntu/work\""
        );
    }

    #[test]
    fn test_fixed_commands() {
        assert_eq!(which("sshfs"), "which sshfs");
        assert_eq!(home_dir(), "bash -c 'echo ${HOME}'");
        assert_eq!(user_name(), "id -nu");
        assert_eq!(group_name(), "id -ng");
        assert_eq!(user_id(), "id -u");
        assert_eq!(group_id(), "id -g");
    }
}
