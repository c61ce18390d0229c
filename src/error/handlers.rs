//! Error handlers
//!
//! Reporting helpers used by the command-line front end.

use crate::error::types::ClientError;
use log::error;

/// Log a client error
pub fn handle_error(err: &ClientError) {
    error!("FTP Client Error: {}", err);
}

/// Convert error to a process exit code (sysexits values)
pub fn error_to_exit_code(err: &ClientError) -> i32 {
    match err {
        ClientError::Configuration(_) => 78,
        ClientError::EngineInit(_) => 70,
        ClientError::EngineOption { .. } => 70,
        ClientError::Transfer { .. } => 69,
        ClientError::Staging(_) => 74,
        ClientError::NotConnected => 70,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_map_to_config_exit_code() {
        let err = ClientError::Configuration("empty host".into());
        assert_eq!(error_to_exit_code(&err), 78);
    }

    #[test]
    fn transfer_errors_map_to_unavailable() {
        let err = ClientError::Transfer {
            path: "/a".into(),
            code: 550,
            message: String::new(),
        };
        assert_eq!(error_to_exit_code(&err), 69);
    }
}
