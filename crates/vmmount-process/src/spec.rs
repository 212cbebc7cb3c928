//! Declarative process descriptions.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::Level;

/// What to run.
///
/// Specs are handed to a [`ProcessSpawner`](crate::ProcessSpawner) by value
/// and never change after that.
pub trait ProcessSpec: Send {
    fn program(&self) -> String;

    fn arguments(&self) -> Vec<String>;

    /// Variables layered over the inherited environment.
    fn environment(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Directory to start in. `None` keeps the parent's.
    fn working_directory(&self) -> Option<PathBuf> {
        None
    }

    /// Level at which a failed run's stderr is logged.
    fn error_log_level(&self) -> Level {
        Level::WARN
    }
}

/// A [`ProcessSpec`] assembled in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    arguments: Vec<String>,
    environment: BTreeMap<String, String>,
    working_directory: Option<PathBuf>,
    error_log_level: Level,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            arguments: Vec::new(),
            environment: BTreeMap::new(),
            working_directory: None,
            error_log_level: Level::WARN,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn error_log_level(mut self, level: Level) -> Self {
        self.error_log_level = level;
        self
    }
}

impl ProcessSpec for CommandSpec {
    fn program(&self) -> String {
        self.program.clone()
    }

    fn arguments(&self) -> Vec<String> {
        self.arguments.clone()
    }

    fn environment(&self) -> BTreeMap<String, String> {
        self.environment.clone()
    }

    fn working_directory(&self) -> Option<PathBuf> {
        self.working_directory.clone()
    }

    fn error_log_level(&self) -> Level {
        self.error_log_level
    }
}
