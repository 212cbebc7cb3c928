//! Guest path resolution.
//!
//! Turns a mount target into an absolute guest path and splits it into the
//! part that already exists and the part that still has to be created.

use crate::commands;
use crate::constants::GUEST_PATH_SEPARATOR;
use crate::error::{MountError, MountResult};
use crate::runner::run_cmd;
use crate::session::RemoteSession;

/// A target path split against the guest filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestPath {
    /// Absolute guest path of the mount target.
    pub absolute: String,
    /// Longest existing directory prefix, with trailing separator.
    pub existing: String,
    /// Remainder of `absolute` below `existing`. Empty when the target exists.
    pub missing: String,
}

impl GuestPath {
    /// Resolve `target` on the guest: make it absolute, then find what exists.
    pub fn resolve<S>(session: &mut S, target: &str) -> MountResult<Self>
    where
        S: RemoteSession + ?Sized,
    {
        let absolute = absolute_path(session, target)?;
        Self::split(session, absolute)
    }

    /// Split an already absolute path against the guest filesystem.
    pub fn split<S>(session: &mut S, absolute: String) -> MountResult<Self>
    where
        S: RemoteSession + ?Sized,
    {
        let existing = existing_prefix(session, &absolute)?;
        let missing = missing_suffix(&absolute, &existing).to_string();
        Ok(Self {
            absolute,
            existing,
            missing,
        })
    }

    /// True when nothing needs to be created.
    pub fn fully_exists(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Home directory of the session user, always ending in exactly one `/`.
pub fn home_directory<S>(session: &mut S) -> MountResult<String>
where
    S: RemoteSession + ?Sized,
{
    let command = commands::home_dir();
    let output = run_cmd(session, &command)?;
    let home = strip_line_terminator(&output).trim_end_matches(GUEST_PATH_SEPARATOR);
    if home.is_empty() && !output.starts_with(GUEST_PATH_SEPARATOR) {
        return Err(MountError::malformed_response(command, output));
    }

    let mut home = home.to_string();
    home.push(GUEST_PATH_SEPARATOR);
    Ok(home)
}

/// Express `path` as an absolute guest path.
///
/// Absolute paths are returned unchanged; anything else is taken relative to
/// the session user's home directory.
pub fn absolute_path<S>(session: &mut S, path: &str) -> MountResult<String>
where
    S: RemoteSession + ?Sized,
{
    if path.starts_with(GUEST_PATH_SEPARATOR) {
        return Ok(path.to_string());
    }
    Ok(home_directory(session)? + path)
}

/// The longest prefix of `absolute_path` that is an existing directory on
/// the guest, with a trailing separator.
pub fn existing_prefix<S>(session: &mut S, absolute_path: &str) -> MountResult<String>
where
    S: RemoteSession + ?Sized,
{
    let output = run_cmd(session, &commands::existing_dirs(absolute_path))?;
    Ok(strip_line_terminator(&output).to_string())
}

/// What is left of `absolute` once `existing` has been taken off the front.
pub fn missing_suffix<'a>(absolute: &'a str, existing: &str) -> &'a str {
    if existing.len() >= absolute.len() {
        return "";
    }
    absolute.get(existing.len()..).unwrap_or("")
}

fn strip_line_terminator(output: &str) -> &str {
    output
        .strip_suffix('\n')
        .map(|s| s.strip_suffix('\r').unwrap_or(s))
        .unwrap_or(output)
}
