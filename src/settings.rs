//! Configuration management for RAX FTP Client
//!
//! `Settings` is what the command-line front end loads from `config.toml` and
//! the environment. `ConnectionConfig` is the explicit, typed description of
//! one FTP session handed to the client.

use config::{Config, Environment, File, Map, Value, ValueKind};
use serde::Deserialize;

use crate::engine::request::{ACTIVE_PORT_AUTO, ConnectionOptions, Credentials, TlsOptions};
use crate::error::ClientError;
use crate::utils::validation::{is_empty_value, kind_name};

pub const DEFAULT_PORT: u16 = 21;
pub const ANONYMOUS_USER: &str = "anonymous";
pub const ANONYMOUS_PASSWORD: &str = "anonymous@noserver.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings loaded by the command-line front end
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Default log filter, overridden by `RUST_LOG`
    #[serde(default = "default_verbosity")]
    pub verbosity: String,

    /// Connection arguments as accepted by `FtpClient::open`
    /// Environment: RAX_FTP_CONNECTION_HOST, RAX_FTP_CONNECTION_PORT, ...
    #[serde(default)]
    pub connection: Map<String, Value>,
}

fn default_verbosity() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings from an optional config file with environment overrides.
    ///
    /// Without an explicit path, `rax-ftp-client/config` and `config` are
    /// tried; both are optional.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder
                .add_source(File::with_name("rax-ftp-client/config").required(false))
                .add_source(File::with_name("config").required(false)),
        };

        builder
            .add_source(Environment::with_prefix("RAX_FTP").separator("_"))
            .build()?
            .try_deserialize()
    }
}

/// Parameters of one FTP session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
    pub use_tls: bool,
    pub use_passive_mode: bool,
    pub timeout_secs: u64,
}

impl ConnectionConfig {
    /// Anonymous, plain, active-mode session on port 21.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            credentials: Credentials::new(ANONYMOUS_USER, ANONYMOUS_PASSWORD),
            use_tls: false,
            use_passive_mode: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the user with the default password for it.
    pub fn with_user(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        let password = default_password(&username);
        self.credentials = Credentials::new(username, password);
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Credentials::new(username, password);
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_passive_mode(mut self, use_passive_mode: bool) -> Self {
        self.use_passive_mode = use_passive_mode;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Builds a config from loosely typed arguments.
    ///
    /// Recognized keys: `host`, `port`, `user`, `password`, `ssl`, `passive`,
    /// `timeout`. Missing or nil keys take their defaults; the host is
    /// required.
    pub fn from_map(args: &Map<String, Value>) -> Result<Self, ClientError> {
        let host = match lookup(args, "host") {
            None => return Err(empty_host()),
            Some(value) if is_empty_value(value) => return Err(empty_host()),
            Some(value) => match &value.kind {
                ValueKind::String(host) => host.clone(),
                _ => {
                    return Err(ClientError::Configuration(format!(
                        "The specified host must be a string, got {}.",
                        kind_name(value)
                    )));
                }
            },
        };

        let port = match lookup(args, "port") {
            Some(value) => {
                let port = int_value("port", value)?;
                u16::try_from(port).map_err(|_| {
                    ClientError::Configuration(format!("Port {port} is out of range."))
                })?
            }
            None => DEFAULT_PORT,
        };

        let username = match lookup(args, "user") {
            Some(value) => string_value("user", value)?,
            None => ANONYMOUS_USER.to_string(),
        };
        let password = match lookup(args, "password") {
            Some(value) => string_value("password", value)?,
            None => default_password(&username).to_string(),
        };

        let use_tls = match lookup(args, "ssl") {
            Some(value) => bool_value("ssl", value)?,
            None => false,
        };
        let use_passive_mode = match lookup(args, "passive") {
            Some(value) => bool_value("passive", value)?,
            None => false,
        };

        let timeout_secs = match lookup(args, "timeout") {
            Some(value) => {
                let timeout = int_value("timeout", value)?;
                u64::try_from(timeout).map_err(|_| {
                    ClientError::Configuration(format!("Timeout {timeout} must not be negative."))
                })?
            }
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            host,
            port,
            credentials: Credentials::new(username, password),
            use_tls,
            use_passive_mode,
            timeout_secs,
        })
    }

    /// A session cannot be established without a host.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.host.trim().is_empty() {
            return Err(empty_host());
        }
        Ok(())
    }

    /// URL scheme for this session.
    pub fn scheme(&self) -> &'static str {
        if self.use_tls { "ftps" } else { "ftp" }
    }

    /// Base transfer options shared by every request of the session.
    pub fn connection_options(&self) -> ConnectionOptions {
        let mut options =
            ConnectionOptions::new(self.port, self.credentials.clone(), self.timeout_secs);

        if self.use_tls {
            options = options.with_tls(TlsOptions::permissive());
        }

        if !self.use_passive_mode {
            options = options.with_active_port(ACTIVE_PORT_AUTO);
        }

        options
    }
}

fn default_password(username: &str) -> &'static str {
    if username == ANONYMOUS_USER {
        ANONYMOUS_PASSWORD
    } else {
        ""
    }
}

fn empty_host() -> ClientError {
    ClientError::Configuration("The specified host is empty. Set the host and try again.".into())
}

fn lookup<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    args.get(key)
        .filter(|value| !matches!(value.kind, ValueKind::Nil))
}

fn invalid(key: &str, err: config::ConfigError) -> ClientError {
    ClientError::Configuration(format!("Invalid value for {key}: {err}"))
}

fn int_value(key: &str, value: &Value) -> Result<i64, ClientError> {
    value.clone().into_int().map_err(|e| invalid(key, e))
}

fn bool_value(key: &str, value: &Value) -> Result<bool, ClientError> {
    value.clone().into_bool().map_err(|e| invalid(key, e))
}

fn string_value(key: &str, value: &Value) -> Result<String, ClientError> {
    value.clone().into_string().map_err(|e| invalid(key, e))
}
