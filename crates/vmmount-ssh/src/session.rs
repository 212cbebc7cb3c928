//! SSH session to a guest.
//!
//! Uses russh for SSH transport with agent or key-file authentication. The
//! session owns a current-thread tokio runtime so the synchronous
//! [`RemoteSession::exec`] can drive russh with `block_on`. Do not call it
//! from inside another tokio runtime.

use std::sync::Arc;

use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::{HashAlg, PrivateKeyWithHashAlg, PublicKey};
use russh::{ChannelMsg, Disconnect};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use vmmount_core::{RemoteProcess, RemoteSession, SessionError};

use crate::config::SshConfig;
use crate::constants::{
    SSH_EXTENDED_DATA_STDERR, SSH_INACTIVITY_TIMEOUT, SSH_KEEPALIVE_INTERVAL, SSH_KEEPALIVE_MAX,
};
use crate::error::SshError;

/// Client handler for russh - handles server key verification
struct ClientHandler {
    config: SshConfig,
}

impl client::Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let actual = server_public_key.fingerprint(HashAlg::Sha256).to_string();
        match &self.config.host_key_fingerprint {
            Some(expected) if !self.config.host_key_matches(&actual) => {
                Err(SshError::HostKeyMismatch {
                    expected: expected.clone(),
                    actual,
                })
            }
            Some(_) => Ok(true),
            None => {
                warn!(
                    host = %self.config.host,
                    "Accepting guest host key without verification: {}", actual
                );
                Ok(true)
            }
        }
    }
}

/// Authenticated SSH session to one guest.
pub struct SshSession {
    config: SshConfig,
    runtime: Runtime,
    handle: Option<Handle<ClientHandler>>,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("username", &self.config.username)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl SshSession {
    /// Connect and authenticate.
    pub fn connect(config: SshConfig) -> Result<Self, SshError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SshError::Runtime(e.to_string()))?;

        let handle = runtime.block_on(open_session(&config))?;
        Ok(Self {
            config,
            runtime,
            handle: Some(handle),
        })
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_closed()).unwrap_or(false)
    }

    /// Disconnect from the guest
    pub fn disconnect(&mut self) -> Result<(), SshError> {
        if let Some(handle) = self.handle.take() {
            self.runtime
                .block_on(handle.disconnect(Disconnect::ByApplication, "Client disconnecting", "en"))
                .map_err(|e| SshError::ConnectionFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn run(&self, command: &str) -> Result<RemoteProcess, SshError> {
        let handle = self.handle.as_ref().ok_or(SshError::Disconnected)?;
        self.runtime.block_on(exec_on(handle, command))
    }
}

impl RemoteSession for SshSession {
    fn exec(&mut self, command: &str) -> Result<RemoteProcess, SessionError> {
        Ok(self.run(command)?)
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            debug!("disconnect on drop failed: {}", e);
        }
    }
}

async fn open_session(config: &SshConfig) -> Result<Handle<ClientHandler>, SshError> {
    let client_config = Config {
        inactivity_timeout: Some(SSH_INACTIVITY_TIMEOUT),
        keepalive_interval: Some(SSH_KEEPALIVE_INTERVAL),
        keepalive_max: SSH_KEEPALIVE_MAX,
        ..<_>::default()
    };

    let handler = ClientHandler {
        config: config.clone(),
    };
    let addr = (config.host.as_str(), config.port);
    let mut session = client::connect(Arc::new(client_config), addr, handler).await?;

    info!(
        "Connected to {}:{}, attempting authentication",
        config.host, config.port
    );

    match config.expanded_key_path() {
        Some(path) => authenticate_with_key_file(&mut session, config, &path).await?,
        None => authenticate_with_agent(&mut session, config).await?,
    }

    Ok(session)
}

async fn authenticate_with_key_file(
    session: &mut Handle<ClientHandler>,
    config: &SshConfig,
    path: &std::path::Path,
) -> Result<(), SshError> {
    let key = russh::keys::load_secret_key(path, None).map_err(|e| SshError::KeyLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let hash_alg = session
        .best_supported_rsa_hash()
        .await
        .ok()
        .flatten()
        .flatten();

    let result = session
        .authenticate_publickey(
            &config.username,
            PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
        )
        .await?;

    if !result.success() {
        return Err(SshError::AuthFailed(format!(
            "key {} rejected for {}",
            path.display(),
            config.username
        )));
    }
    info!("Authenticated as {} with key file", config.username);
    Ok(())
}

async fn authenticate_with_agent(
    session: &mut Handle<ClientHandler>,
    config: &SshConfig,
) -> Result<(), SshError> {
    let mut agent = AgentClient::connect_env()
        .await
        .map_err(|e| SshError::AgentFailed(e.to_string()))?;

    let keys = agent
        .request_identities()
        .await
        .map_err(|e| SshError::AgentFailed(e.to_string()))?;

    if keys.is_empty() {
        return Err(SshError::NoKeysAvailable);
    }

    info!("Found {} keys in SSH agent", keys.len());

    // Try each key until one works
    for key in &keys {
        debug!("Trying key: {}", key.fingerprint(HashAlg::Sha256));

        let hash_alg = session
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();

        let result = session
            .authenticate_publickey_with(&config.username, key.clone(), hash_alg, &mut agent)
            .await;

        match result {
            Ok(auth_result) if auth_result.success() => {
                info!(
                    "Authenticated as {} with key {}",
                    config.username,
                    key.fingerprint(HashAlg::Sha256)
                );
                return Ok(());
            }
            Ok(_) => {
                debug!("Key rejected, trying next...");
            }
            Err(e) => {
                warn!("Auth error with key: {}", e);
            }
        }
    }

    Err(SshError::AuthFailed("No keys accepted by guest".into()))
}

async fn exec_on(handle: &Handle<ClientHandler>, command: &str) -> Result<RemoteProcess, SshError> {
    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| SshError::ChannelFailed(format!("open: {}", e)))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| SshError::ChannelFailed(format!("exec: {}", e)))?;

    let mut output = OutputCollector::default();
    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => output.stdout(data),
            ChannelMsg::ExtendedData { ref data, ext } => {
                if ext == SSH_EXTENDED_DATA_STDERR {
                    output.stderr(data);
                }
            }
            ChannelMsg::ExitStatus { exit_status } => output.exit(exit_status),
            _ => {}
        }
    }

    Ok(output.finish())
}

/// Accumulates one command's output as channel messages arrive.
#[derive(Debug, Default)]
struct OutputCollector {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: Option<u32>,
}

impl OutputCollector {
    fn stdout(&mut self, data: &[u8]) {
        self.stdout.extend_from_slice(data);
    }

    fn stderr(&mut self, data: &[u8]) {
        self.stderr.extend_from_slice(data);
    }

    fn exit(&mut self, status: u32) {
        self.exit_status = Some(status);
    }

    /// No exit status (killed by a signal, channel torn down) reads as `-1`.
    fn finish(self) -> RemoteProcess {
        let exit_code = self
            .exit_status
            .and_then(|status| i32::try_from(status).ok())
            .unwrap_or(-1);
        RemoteProcess::new(
            exit_code,
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_splits_streams() {
        let mut output = OutputCollector::default();
        output.stdout(b"/home/");
        output.stdout(b"ubuntu\n");
        output.stderr(b"warning\n");
        output.exit(0);

        let process = output.finish();
        assert!(process.success());
        assert_eq!(process.read_std_output(), "/home/ubuntu\n");
        assert_eq!(process.read_std_error(), "warning\n");
    }

    #[test]
    fn test_collector_without_exit_status() {
        let mut output = OutputCollector::default();
        output.stdout(b"partial");

        let process = output.finish();
        assert_eq!(process.exit_code(), -1);
        assert!(!process.success());
    }

    #[test]
    fn test_collector_non_zero() {
        let mut output = OutputCollector::default();
        output.stderr(b"which: no sshfs\n");
        output.exit(1);

        let process = output.finish();
        assert_eq!(process.exit_code(), 1);
        assert_eq!(process.read_std_error(), "which: no sshfs\n");
    }

    #[test]
    fn test_connect_refused() {
        // Port 1 on localhost is reserved and should refuse immediately.
        let config = SshConfig {
            port: 1,
            key_path: Some("/nonexistent".into()),
            ..SshConfig::new("127.0.0.1", "nobody")
        };
        let err = SshSession::connect(config).unwrap_err();
        assert!(matches!(err, SshError::ConnectionFailed(_)));
    }
}
