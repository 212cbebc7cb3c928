//! vmmount binary
//!
//! Prepares a guest for an sshfs mount and runs diagnostics over the same
//! SSH session the mount would use.
//!
//! ## Usage
//!
//! ```bash
//! # Probe for sshfs, create the target, hand it to the guest user
//! vmmount prepare
//!
//! # Run one command on the guest through the runner
//! vmmount exec 'ls -la ~'
//!
//! # Same command on the host, for comparison
//! vmmount exec --local 'ls -la ~'
//!
//! # Explicit config file
//! vmmount --config ./guest.ron prepare
//! ```
//!
//! The config file defaults to `<config dir>/vmmount/config.ron`.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::runtime::Builder;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vmmount_core::{
    ConfigError, DefaultIdentity, GuestOwner, GuestPath, MountError, check_sshfs_exists,
    default_identity, provision, run_cmd,
};
use vmmount_process::constants::PROCESS_TIMEOUT;
use vmmount_process::{CommandSpec, ProcessError, SharedSpawner, default_spawner};
use vmmount_ssh::{SshError, SshSession};

use crate::config::VmmountConfig;

#[derive(Parser, Debug)]
#[command(name = "vmmount")]
#[command(about = "Expose host directories inside a VM over sshfs")]
struct Args {
    /// Config file (default: <config dir>/vmmount/config.ron)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check for sshfs, create the mount target and fix its ownership
    Prepare,
    /// Run a command on the guest and print its output
    Exec {
        /// Run on the host through the process spawner instead of the guest
        #[arg(long)]
        local: bool,
        /// Command line, passed to the shell as-is
        command: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ssh(#[from] SshError),
    #[error(transparent)]
    Mount(#[from] MountError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("local command exited with {code:?}: {stderr}")]
    LocalCommandFailed { code: Option<i32>, stderr: String },
}

/// What `prepare` established on the guest.
struct Prepared {
    path: GuestPath,
    owner: GuestOwner,
    identity: DefaultIdentity,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let spawner = default_spawner();

    let result = match args.command {
        Command::Prepare => cmd_prepare(args.config).map(|prepared| {
            println!("target:   {}", prepared.path.absolute);
            if prepared.path.fully_exists() {
                println!("created:  (nothing, target exists)");
            } else {
                println!("created:  {}{}", prepared.path.existing, prepared.path.missing);
            }
            println!("owner:    {}:{}", prepared.owner.user, prepared.owner.group);
            println!(
                "identity: uid={} gid={}",
                prepared.identity.uid, prepared.identity.gid
            );
        }),
        Command::Exec {
            local: true,
            command,
        } => cmd_exec_local(&spawner, &command).map(|stdout| {
            print!("{}", stdout);
        }),
        Command::Exec {
            local: false,
            command,
        } => cmd_exec(args.config, &command).map(|stdout| {
            print!("{}", stdout);
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn connect(config: &VmmountConfig) -> Result<SshSession, CliError> {
    tracing::info!(
        host = %config.ssh.host,
        port = config.ssh.port,
        user = %config.ssh.username,
        "Connecting to guest"
    );
    Ok(SshSession::connect(config.ssh.clone())?)
}

fn cmd_prepare(config_path: Option<PathBuf>) -> Result<Prepared, CliError> {
    let config = VmmountConfig::load(config_path.as_deref())?;
    let mut session = connect(&config)?;

    check_sshfs_exists(&mut session)?;
    let path = GuestPath::resolve(&mut session, &config.mount.target)?;
    let owner = provision(&mut session, &path)?;
    let identity = default_identity(&mut session)?;

    session.disconnect()?;
    Ok(Prepared {
        path,
        owner,
        identity,
    })
}

fn cmd_exec(config_path: Option<PathBuf>, command: &str) -> Result<String, CliError> {
    let config = VmmountConfig::load(config_path.as_deref())?;
    let mut session = connect(&config)?;
    let stdout = run_cmd(&mut session, command)?;
    session.disconnect()?;
    Ok(stdout)
}

/// Run `command` under `sh -c` on the host, through `spawner`.
fn cmd_exec_local(spawner: &SharedSpawner, command: &str) -> Result<String, CliError> {
    let spec = CommandSpec::new("sh").args(["-c", command]);
    let process = spawner.create_process(Box::new(spec))?;

    let runtime = Builder::new_current_thread().enable_all().build()?;
    let output = runtime.block_on(process.execute(PROCESS_TIMEOUT))?;
    if !output.success() {
        return Err(CliError::LocalCommandFailed {
            code: output.exit_code,
            stderr: output.stderr.trim_end().to_string(),
        });
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::sync::{Arc, Mutex};
    use vmmount_process::{Process, ProcessSpawner, ProcessSpec, UnsecuredSpawner};

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_exec() {
        let args = Args::try_parse_from(["vmmount", "--config", "/tmp/x.ron", "exec", "id -u"])
            .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/x.ron")));
        match args.command {
            Command::Exec { local, command } => {
                assert!(!local);
                assert_eq!(command, "id -u");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_exec_local() {
        let args = Args::try_parse_from(["vmmount", "exec", "--local", "uname"]).unwrap();
        assert!(matches!(args.command, Command::Exec { local: true, .. }));
    }

    /// Passes specs through unchanged and remembers the programs it saw.
    #[derive(Default)]
    struct RecordingSpawner {
        programs: Mutex<Vec<Vec<String>>>,
    }

    impl ProcessSpawner for RecordingSpawner {
        fn create_process(&self, spec: Box<dyn ProcessSpec>) -> Result<Process, ProcessError> {
            let mut line = vec![spec.program()];
            line.extend(spec.arguments());
            self.programs.lock().unwrap().push(line);
            UnsecuredSpawner.create_process(spec)
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_local_exec_goes_through_spawner() {
        let recorder = Arc::new(RecordingSpawner::default());
        let spawner: SharedSpawner = recorder.clone();

        let stdout = cmd_exec_local(&spawner, "echo hello").unwrap();
        assert_eq!(stdout, "hello\n");
        assert_eq!(
            *recorder.programs.lock().unwrap(),
            vec![vec!["sh".to_string(), "-c".into(), "echo hello".into()]]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_local_exec_failure() {
        let err = cmd_exec_local(&default_spawner(), "echo nope >&2; exit 4").unwrap_err();
        match err {
            CliError::LocalCommandFailed { code, stderr } => {
                assert_eq!(code, Some(4));
                assert_eq!(stderr, "nope");
            }
            other => panic!("expected LocalCommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["vmmount"]).is_err());
    }
}
