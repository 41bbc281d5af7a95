//! Server endpoints and the process launcher.
//!
//! A [`ServerEndpoint`] describes how to start a server script. The
//! [`Launcher`] turns a validated endpoint into an open [`Transport`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::ServerConfig;
use crate::error::{ClientError, ClientResult};
use crate::mcp::transport::{StdioTransport, Transport};

/// The only server script extension the client knows how to invoke.
pub const SUPPORTED_EXTENSION: &str = "py";

/// Immutable description of how to reach a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    script: PathBuf,
    interpreter: String,
    args: Vec<String>,
    env: Option<HashMap<String, String>>,
}

impl ServerEndpoint {
    /// Creates an endpoint running `script` with the default `python`
    /// interpreter and the inherited environment.
    #[must_use]
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            interpreter: "python".to_string(),
            args: Vec::new(),
            env: None,
        }
    }

    /// Creates an endpoint for `script` using the launch settings from the
    /// configuration file.
    #[must_use]
    pub fn from_config(script: impl Into<PathBuf>, config: &ServerConfig) -> Self {
        Self {
            script: script.into(),
            interpreter: config.interpreter.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
        }
    }

    /// Sets the interpreter.
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Appends an argument passed after the script path.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets an environment override. The rest of the environment is still
    /// inherited.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns the server script path.
    #[must_use]
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Returns the interpreter command.
    #[must_use]
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Returns the environment overrides, if any.
    #[must_use]
    pub const fn env(&self) -> Option<&HashMap<String, String>> {
        self.env.as_ref()
    }

    /// Checks that the script is of the recognised kind.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnsupportedServerKind`] unless the script path
    /// ends in `.py`.
    pub fn validate(&self) -> ClientResult<()> {
        let supported = self
            .script
            .extension()
            .is_some_and(|ext| ext == SUPPORTED_EXTENSION);

        if supported {
            Ok(())
        } else {
            Err(ClientError::UnsupportedServerKind {
                path: self.script.clone(),
                expected: SUPPORTED_EXTENSION,
            })
        }
    }

    /// Builds the command for this endpoint: `interpreter script args…`.
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&self.script).args(&self.args);

        if let Some(env) = &self.env {
            cmd.envs(env);
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

/// Opens transports to servers.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Validates `endpoint` and opens a transport to it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnsupportedServerKind`] before starting
    /// anything if the endpoint is invalid, or
    /// [`ClientError::TransportStartFailure`] if the server cannot be started.
    async fn open(&self, endpoint: &ServerEndpoint) -> ClientResult<Box<dyn Transport>>;
}

/// Launches the server as a child process speaking over its stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn open(&self, endpoint: &ServerEndpoint) -> ClientResult<Box<dyn Transport>> {
        endpoint.validate()?;

        let child = endpoint
            .command()
            .spawn()
            .map_err(|source| ClientError::TransportStartFailure {
                command: endpoint.interpreter.clone(),
                source,
            })?;

        let transport = StdioTransport::from_child(child)?;
        tracing::info!(
            pid = transport.process_id(),
            interpreter = %endpoint.interpreter,
            script = %endpoint.script.display(),
            "Server process started"
        );

        Ok(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_scripts_are_supported() {
        assert!(ServerEndpoint::new("echo_server.py").validate().is_ok());
        assert!(ServerEndpoint::new("/srv/tools/weather.py").validate().is_ok());
    }

    #[test]
    fn other_kinds_are_rejected() {
        for path in ["server.exe", "server.js", "server", "server.py.bak", "py"] {
            let err = ServerEndpoint::new(path).validate().unwrap_err();
            assert!(
                matches!(err, ClientError::UnsupportedServerKind { .. }),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn from_config_copies_launch_settings() {
        let config = ServerConfig {
            interpreter: "python3".to_string(),
            args: vec!["--stdio".to_string()],
            env: Some(HashMap::from([("MODE".to_string(), "test".to_string())])),
        };
        let endpoint = ServerEndpoint::from_config("server.py", &config);

        assert_eq!(endpoint.interpreter(), "python3");
        assert_eq!(endpoint.args, vec!["--stdio".to_string()]);
        assert_eq!(
            endpoint.env().and_then(|env| env.get("MODE")).map(String::as_str),
            Some("test")
        );
    }

    #[test]
    fn args_follow_the_script() {
        let endpoint = ServerEndpoint::new("server.py")
            .with_arg("--stdio")
            .with_arg("--quiet");
        assert_eq!(endpoint.args, ["--stdio", "--quiet"]);

        let cmd = endpoint.command();
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, ["server.py", "--stdio", "--quiet"]);
    }

    #[test]
    fn env_overrides_are_optional() {
        let inherit = ServerEndpoint::new("server.py");
        assert!(inherit.env().is_none());

        let overridden = inherit.with_env("KEY", "value");
        assert_eq!(overridden.env().map(HashMap::len), Some(1));
    }

    #[tokio::test]
    async fn unsupported_kind_fails_before_spawning() {
        let endpoint = ServerEndpoint::new("server.exe").with_interpreter("/nonexistent/interpreter");
        let Err(err) = ProcessLauncher.open(&endpoint).await else {
            panic!("Expected UnsupportedServerKind");
        };
        assert!(matches!(err, ClientError::UnsupportedServerKind { .. }));
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_start_failure() {
        let endpoint =
            ServerEndpoint::new("server.py").with_interpreter("/nonexistent/mcp-client-interpreter");
        let Err(err) = ProcessLauncher.open(&endpoint).await else {
            panic!("Expected TransportStartFailure");
        };
        assert!(matches!(err, ClientError::TransportStartFailure { .. }));
    }
}
