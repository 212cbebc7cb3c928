//! In-memory guest for tests.
//!
//! [`FakeGuest`] models just enough of a Linux guest to answer every command
//! in [`crate::commands`]: a set of existing directories, a home directory,
//! the `id` outputs, whether `sshfs` is installed, and who owns what after
//! `chown`. Every command text is logged so tests can assert on the exact
//! protocol. Canned replies set with [`FakeGuest::respond`] win over the model.
//!
//! [`RecordingServer`] is a transfer server that blocks in `run` until
//! stopped and reports its lifecycle back to the guest it was built on.
//!
//! Compiled only for this crate's tests and under the `test-mock` feature.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::session::{RemoteProcess, RemoteSession, SessionError};
use crate::transfer::{TransferParams, TransferServer};

#[derive(Debug)]
struct GuestState {
    home: String,
    user_name: String,
    group_name: String,
    uid_output: String,
    gid_output: String,
    sshfs_installed: bool,
    dirs: BTreeSet<String>,
    owners: BTreeMap<String, String>,
    replies: HashMap<String, RemoteProcess>,
    transport_failure: Option<String>,
    log: Vec<String>,
    served: Option<TransferParams>,
    stop_signals: usize,
    run_exits: usize,
}

/// Shared handle to a simulated guest. Clones see the same guest.
#[derive(Debug, Clone)]
pub struct FakeGuest {
    state: Arc<Mutex<GuestState>>,
}

impl Default for FakeGuest {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGuest {
    /// An Ubuntu-like guest: user `ubuntu` (1000:1000), home
    /// `/home/ubuntu`, sshfs installed.
    pub fn new() -> Self {
        let dirs = ["/", "/home", "/home/ubuntu"]
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            state: Arc::new(Mutex::new(GuestState {
                home: "/home/ubuntu".into(),
                user_name: "ubuntu\n".into(),
                group_name: "ubuntu\n".into(),
                uid_output: "1000\n".into(),
                gid_output: "1000\n".into(),
                sshfs_installed: true,
                dirs,
                owners: BTreeMap::new(),
                replies: HashMap::new(),
                transport_failure: None,
                log: Vec::new(),
                served: None,
                stop_signals: 0,
                run_exits: 0,
            })),
        }
    }

    /// A session onto this guest.
    pub fn session(&self) -> FakeSession {
        FakeSession { guest: self.clone() }
    }

    // ── Setup ────────────────────────────────────────────────────────────

    /// Set `$HOME`; the directory and its parents are created.
    pub fn with_home(self, home: &str) -> Self {
        self.add_dir_chain(home);
        self.state.lock().home = home.to_string();
        self
    }

    /// Create `path` and all its parents.
    pub fn with_dir(self, path: &str) -> Self {
        self.add_dir_chain(path);
        self
    }

    pub fn without_sshfs(self) -> Self {
        self.state.lock().sshfs_installed = false;
        self
    }

    /// Raw outputs of `id -nu` and `id -ng`.
    pub fn with_names(self, user: &str, group: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.user_name = user.to_string();
            state.group_name = group.to_string();
        }
        self
    }

    /// Raw outputs of `id -u` and `id -g`.
    pub fn with_ids(self, uid: &str, gid: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.uid_output = uid.to_string();
            state.gid_output = gid.to_string();
        }
        self
    }

    /// Answer `command` with `reply` instead of simulating it.
    pub fn respond(self, command: &str, reply: RemoteProcess) -> Self {
        self.state.lock().replies.insert(command.to_string(), reply);
        self
    }

    /// Make every `exec` fail at the transport level.
    pub fn fail_transport(self, reason: &str) -> Self {
        self.state.lock().transport_failure = Some(reason.to_string());
        self
    }

    // ── Inspection ───────────────────────────────────────────────────────

    /// Every command executed so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    pub fn commands_starting_with(&self, prefix: &str) -> Vec<String> {
        self.state
            .lock()
            .log
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().dirs.contains(&normalize(path))
    }

    /// `user:group` last assigned to `path`, if any.
    pub fn owner_of(&self, path: &str) -> Option<String> {
        self.state.lock().owners.get(&normalize(path)).cloned()
    }

    /// Parameters the transfer server was built with, if one was built.
    pub fn served(&self) -> Option<TransferParams> {
        self.state.lock().served.clone()
    }

    pub fn stop_signals(&self) -> usize {
        self.state.lock().stop_signals
    }

    pub fn run_exits(&self) -> usize {
        self.state.lock().run_exits
    }

    fn add_dir_chain(&self, path: &str) {
        let mut state = self.state.lock();
        let mut current = String::new();
        state.dirs.insert("/".into());
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            state.dirs.insert(current.clone());
        }
    }

    fn exec(&self, command: &str) -> Result<RemoteProcess, SessionError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.transport_failure {
            return Err(SessionError::ConnectionLost(reason.clone()));
        }
        state.log.push(command.to_string());
        if let Some(reply) = state.replies.get(command) {
            return Ok(reply.clone());
        }
        drop(state);
        Ok(self.simulate(command))
    }

    fn simulate(&self, command: &str) -> RemoteProcess {
        let ok = |out: String| RemoteProcess::new(0, out, "");

        if let Some(tool) = command.strip_prefix("which ") {
            return if tool == "sshfs" && self.state.lock().sshfs_installed {
                ok("/usr/bin/sshfs\n".into())
            } else {
                RemoteProcess::new(1, "", "")
            };
        }

        match command {
            "bash -c 'echo ${HOME}'" => return ok(format!("{}\n", self.state.lock().home)),
            "id -nu" => return ok(self.state.lock().user_name.clone()),
            "id -ng" => return ok(self.state.lock().group_name.clone()),
            "id -u" => return ok(self.state.lock().uid_output.clone()),
            "id -g" => return ok(self.state.lock().gid_output.clone()),
            _ => {}
        }

        if let Some(path) = between(command, "/bin/bash -c 'P=\"", "\"; while") {
            return ok(format!("{}/\n", self.existing_dir(path)));
        }

        if let Some(rest) = command.strip_prefix("cd \"") {
            if let Some((root, missing)) = rest
                .split_once("\" && sudo mkdir -p \"")
                .and_then(|(root, tail)| tail.strip_suffix('"').map(|m| (root, m)))
            {
                let joined = format!("{}/{}", root.trim_end_matches('/'), missing);
                self.add_dir_chain(&joined);
                return ok(String::new());
            }
        }

        if let Some(rest) = command.strip_prefix("sudo chown ") {
            if let Some((owner, path)) = rest.split_once(" \"") {
                let path = path.trim_end_matches('"');
                let mut state = self.state.lock();
                if !state.dirs.contains(&normalize(path)) {
                    return RemoteProcess::new(
                        1,
                        "",
                        format!("chown: cannot access '{path}': No such file or directory"),
                    );
                }
                state.owners.insert(normalize(path), owner.to_string());
                return ok(String::new());
            }
        }

        RemoteProcess::new(127, "", format!("{command}: command not found"))
    }

    /// Mirror of `while [ ! -d "$P/" ]; do P=${P%/*}; done`.
    fn existing_dir(&self, path: &str) -> String {
        let state = self.state.lock();
        let mut current = path.to_string();
        while !state.dirs.contains(&normalize(&format!("{current}/"))) {
            match current.rfind('/') {
                Some(idx) => current.truncate(idx),
                None => current.clear(),
            }
        }
        current
    }

    fn record_server(&self, params: TransferParams) {
        self.state.lock().served = Some(params);
    }
}

/// Session onto a [`FakeGuest`].
#[derive(Debug, Clone)]
pub struct FakeSession {
    guest: FakeGuest,
}

impl FakeSession {
    pub fn guest(&self) -> &FakeGuest {
        &self.guest
    }
}

impl RemoteSession for FakeSession {
    fn exec(&mut self, command: &str) -> Result<RemoteProcess, SessionError> {
        self.guest.exec(command)
    }
}

/// Transfer server that serves nothing and records its lifecycle.
pub struct RecordingServer {
    guest: FakeGuest,
    params: TransferParams,
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl RecordingServer {
    pub fn params(&self) -> &TransferParams {
        &self.params
    }
}

impl TransferServer for RecordingServer {
    type Session = FakeSession;

    fn new(session: FakeSession, params: TransferParams) -> Self {
        let guest = session.guest;
        guest.record_server(params.clone());
        Self {
            guest,
            params,
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    fn run(&self) {
        let mut stopped = self.stopped.lock();
        while !*stopped {
            self.wake.wait(&mut stopped);
        }
        drop(stopped);
        self.guest.state.lock().run_exits += 1;
    }

    fn stop(&self) {
        self.guest.state.lock().stop_signals += 1;
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(start)?;
    rest.find(end).map(|idx| &rest[..idx])
}

/// Collapse repeated and trailing separators: `/a//b/` → `/a/b`.
fn normalize(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_dir_mirrors_shell_loop() {
        let guest = FakeGuest::new();
        assert_eq!(guest.existing_dir("/home/ubuntu/a/b"), "/home/ubuntu");
        assert_eq!(guest.existing_dir("/nope"), "");
        assert_eq!(guest.existing_dir("/home/"), "/home/");
    }

    #[test]
    fn test_unknown_command() {
        let guest = FakeGuest::new();
        let reply = guest.session().exec("reboot").unwrap();
        assert_eq!(reply.exit_code(), 127);
    }
}
