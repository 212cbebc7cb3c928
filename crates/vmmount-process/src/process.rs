//! Configured child processes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{Level, debug, error, info, trace, warn};

use crate::error::ProcessError;
use crate::spec::ProcessSpec;

/// A child process that is fully configured but not yet started.
///
/// Built by a [`ProcessSpawner`](crate::ProcessSpawner); policies that add
/// confinement do so by rewriting the program and arguments before the
/// process is handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    program: String,
    arguments: Vec<String>,
    environment: BTreeMap<String, String>,
    working_directory: Option<PathBuf>,
    error_log_level: Level,
}

/// Result of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl Process {
    pub fn new<I, A>(program: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
            environment: BTreeMap::new(),
            working_directory: None,
            error_log_level: Level::WARN,
        }
    }

    /// Apply `spec` verbatim.
    pub fn from_spec(spec: &dyn ProcessSpec) -> Self {
        Self {
            program: spec.program(),
            arguments: spec.arguments(),
            environment: spec.environment(),
            working_directory: spec.working_directory(),
            error_log_level: spec.error_log_level(),
        }
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_working_directory(mut self, dir: Option<PathBuf>) -> Self {
        self.working_directory = dir;
        self
    }

    pub fn with_error_log_level(mut self, level: Level) -> Self {
        self.error_log_level = level;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    pub fn error_log_level(&self) -> Level {
        self.error_log_level
    }

    /// The tokio command this process would run.
    ///
    /// Stdout and stderr are piped; the child is killed if its handle is
    /// dropped.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.arguments);
        for (key, value) in &self.environment {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Start the process.
    pub fn start(&self) -> Result<Child, ProcessError> {
        debug!(program = %self.program, args = ?self.arguments, "starting process");
        self.command().spawn().map_err(|source| ProcessError::Spawn {
            program: self.program.clone(),
            source,
        })
    }

    /// Run to completion, killing the child if it outlives `timeout`.
    ///
    /// A non-zero exit is not an error; its stderr is logged at the
    /// process's error-log level and returned in the output.
    pub async fn execute(&self, timeout: Duration) -> Result<ProcessOutput, ProcessError> {
        let child = self.start()?;
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(ProcessError::Timeout {
                    program: self.program.clone(),
                    timeout,
                });
            }
        };

        let output = ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !output.success() {
            self.log_failure(&output);
        }
        Ok(output)
    }

    fn log_failure(&self, output: &ProcessOutput) {
        let program = self.program.as_str();
        let code = output.exit_code;
        let stderr = output.stderr.trim_end();
        let level = self.error_log_level;
        if level == Level::ERROR {
            error!(program, ?code, stderr, "process failed");
        } else if level == Level::WARN {
            warn!(program, ?code, stderr, "process failed");
        } else if level == Level::INFO {
            info!(program, ?code, stderr, "process failed");
        } else if level == Level::DEBUG {
            debug!(program, ?code, stderr, "process failed");
        } else {
            trace!(program, ?code, stderr, "process failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_reflects_process() {
        let process = Process::new("ls", ["-la"])
            .with_environment(BTreeMap::from([("LC_ALL".into(), "C".into())]))
            .with_working_directory(Some("/tmp".into()));

        let cmd = process.command();
        let inner = cmd.as_std();
        assert_eq!(inner.get_program(), "ls");
        assert_eq!(inner.get_args().collect::<Vec<_>>(), vec!["-la"]);
        assert_eq!(inner.get_current_dir(), Some(Path::new("/tmp")));
        let envs: Vec<_> = inner.get_envs().collect();
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].0, "LC_ALL");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_captures_output() {
        let process = Process::new("sh", ["-c", "echo out; echo err >&2"]);
        let output = process.execute(Duration::from_secs(10)).await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_non_zero_is_not_error() {
        let process = Process::new("sh", ["-c", "echo broken >&2; exit 3"])
            .with_error_log_level(Level::DEBUG);
        let output = process.execute(Duration::from_secs(10)).await.unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr, "broken\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_overlays_environment_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let process = Process::new("sh", ["-c", "echo $VMMOUNT_TEST_VAR; pwd"])
            .with_environment(BTreeMap::from([("VMMOUNT_TEST_VAR".into(), "hello".into())]))
            .with_working_directory(Some(dir.path().to_path_buf()));

        let output = process.execute(Duration::from_secs(10)).await.unwrap();
        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("hello"));
        let cwd = PathBuf::from(lines.next().unwrap());
        assert_eq!(
            cwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_timeout() {
        let process = Process::new("sleep", ["5"]);
        let err = process
            .execute(Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let process = Process::new("/nonexistent/vmmount-no-such-binary", Vec::<String>::new());
        let err = process.start().unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
