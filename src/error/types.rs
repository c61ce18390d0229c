//! Error types
//!
//! Defines the errors raised by transfer engines and by the session client.

use std::fmt;
use std::io;

/// Native code used when a failure carries no engine-specific number.
pub const NO_NATIVE_CODE: i32 = 0;

/// Transfer options an engine may refuse to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKey {
    Url,
    Port,
    Timeout,
    UseSsl,
    FtpPort,
    Quote,
}

impl OptionKey {
    /// Stable name used in error messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            OptionKey::Url => "url",
            OptionKey::Port => "port",
            OptionKey::Timeout => "timeout",
            OptionKey::UseSsl => "use_ssl",
            OptionKey::FtpPort => "ftp_port",
            OptionKey::Quote => "quote",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failures reported by a transfer engine
#[derive(Debug)]
pub enum EngineError {
    /// The engine handle could not be acquired.
    Init(String),
    /// An option of the request could not be applied.
    Option {
        option: OptionKey,
        code: i32,
        message: String,
    },
    /// The round trip itself failed.
    Transfer { code: i32, message: String },
}

impl EngineError {
    /// Native error code carried by the failure.
    pub fn code(&self) -> i32 {
        match self {
            EngineError::Init(_) => NO_NATIVE_CODE,
            EngineError::Option { code, .. } => *code,
            EngineError::Transfer { code, .. } => *code,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Init(msg) => write!(f, "Could not initialize transfer engine: {}", msg),
            EngineError::Option {
                option,
                code,
                message,
            } => write!(f, "Could not set option {} ({}): {}", option, code, message),
            EngineError::Transfer { code, message } => {
                write!(f, "Transfer failed ({}): {}", code, message)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors surfaced by the session client operations
#[derive(Debug)]
pub enum ClientError {
    /// Required input was missing or invalid; no network activity happened.
    Configuration(String),
    EngineInit(EngineError),
    EngineOption { option: OptionKey, code: i32 },
    Transfer {
        path: String,
        code: i32,
        message: String,
    },
    /// The temporary upload source could not be prepared.
    Staging(io::Error),
    NotConnected,
}

impl ClientError {
    /// Maps an engine failure raised while handling `path`.
    pub(crate) fn from_engine(path: &str, error: EngineError) -> Self {
        match error {
            err @ EngineError::Init(_) => ClientError::EngineInit(err),
            EngineError::Option { option, code, .. } => ClientError::EngineOption { option, code },
            EngineError::Transfer { code, message } => ClientError::Transfer {
                path: path.to_string(),
                code,
                message,
            },
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ClientError::EngineInit(e) => write!(f, "{}", e),
            ClientError::EngineOption { option, code } => {
                write!(f, "Could not set transfer option with key: {} ({})", option, code)
            }
            ClientError::Transfer {
                path,
                code,
                message,
            } => write!(
                f,
                "Could not handle content in path: {} ({}): {}",
                path, code, message
            ),
            ClientError::Staging(e) => write!(f, "Could not stage upload: {}", e),
            ClientError::NotConnected => write!(f, "Client is not connected"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::EngineInit(e) => Some(e),
            ClientError::Staging(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_failure_keeps_path_and_code() {
        let err = ClientError::from_engine(
            "home/f.txt",
            EngineError::Transfer {
                code: 550,
                message: "No such file".into(),
            },
        );
        match err {
            ClientError::Transfer { path, code, .. } => {
                assert_eq!(path, "home/f.txt");
                assert_eq!(code, 550);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn option_failure_keeps_key() {
        let err = ClientError::from_engine(
            "/",
            EngineError::Option {
                option: OptionKey::Port,
                code: 3,
                message: "port 0".into(),
            },
        );
        assert!(matches!(
            err,
            ClientError::EngineOption {
                option: OptionKey::Port,
                code: 3
            }
        ));
        assert_eq!(
            err.to_string(),
            "Could not set transfer option with key: port (3)"
        );
    }

    #[test]
    fn init_failure_is_not_a_transfer_error() {
        let err = ClientError::from_engine("/", EngineError::Init("no handles".into()));
        assert!(matches!(err, ClientError::EngineInit(_)));
    }
}
