//! Process creation policies.

use std::sync::Arc;

use crate::error::ProcessError;
use crate::process::Process;
use crate::spec::ProcessSpec;

/// Turns a [`ProcessSpec`] into a ready-to-start [`Process`].
///
/// Implementations may confine, rewrite, or reject the spec. The default
/// [`UnsecuredSpawner`] applies it unchanged.
pub trait ProcessSpawner: Send + Sync {
    fn create_process(&self, spec: Box<dyn ProcessSpec>) -> Result<Process, ProcessError>;
}

/// Spawner shared by everything that launches processes.
pub type SharedSpawner = Arc<dyn ProcessSpawner>;

/// Creates processes with no security mechanisms enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsecuredSpawner;

impl ProcessSpawner for UnsecuredSpawner {
    fn create_process(&self, spec: Box<dyn ProcessSpec>) -> Result<Process, ProcessError> {
        Ok(Process::from_spec(spec.as_ref()))
    }
}

pub fn default_spawner() -> SharedSpawner {
    Arc::new(UnsecuredSpawner)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tracing::Level;

    use super::*;
    use crate::spec::CommandSpec;

    /// Runs everything under `env -i`, the shape a confining policy takes.
    struct ScrubbedEnvSpawner;

    impl ProcessSpawner for ScrubbedEnvSpawner {
        fn create_process(&self, spec: Box<dyn ProcessSpec>) -> Result<Process, ProcessError> {
            let program = spec.program();
            if program.is_empty() {
                return Err(ProcessError::Rejected("empty program".into()));
            }
            let mut args = vec!["-i".to_string(), program];
            args.extend(spec.arguments());
            Ok(Process::new("env", args)
                .with_working_directory(spec.working_directory())
                .with_error_log_level(spec.error_log_level()))
        }
    }

    #[test]
    fn test_unsecured_applies_spec_verbatim() {
        let spec = CommandSpec::new("sshfs")
            .args(["-o", "slave"])
            .env("SSHFS_DEBUG", "1")
            .current_dir("/srv")
            .error_log_level(Level::ERROR);

        let process = UnsecuredSpawner.create_process(Box::new(spec)).unwrap();
        assert_eq!(process.program(), "sshfs");
        assert_eq!(process.arguments(), ["-o", "slave"]);
        assert_eq!(process.environment().get("SSHFS_DEBUG").map(String::as_str), Some("1"));
        assert_eq!(process.working_directory(), Some(Path::new("/srv")));
        assert_eq!(process.error_log_level(), Level::ERROR);
    }

    #[test]
    fn test_policies_are_interchangeable() {
        let spawners: Vec<SharedSpawner> = vec![default_spawner(), Arc::new(ScrubbedEnvSpawner)];
        let programs: Vec<String> = spawners
            .iter()
            .map(|spawner| {
                let spec = CommandSpec::new("id").arg("-u");
                spawner
                    .create_process(Box::new(spec))
                    .unwrap()
                    .program()
                    .to_string()
            })
            .collect();

        assert_eq!(programs, vec!["id", "env"]);
    }

    #[test]
    fn test_policy_may_reject() {
        let err = ScrubbedEnvSpawner
            .create_process(Box::new(CommandSpec::new("")))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Rejected(_)));
    }
}
