//! Client session management
//!
//! `FtpClient` exposes the session operations. Each one builds its own
//! transfer request, so nothing set for one operation can leak into the next.

use std::borrow::Cow;

use config::{Map, Value};
use log::{info, warn};

use crate::client::results::RemoteEntry;
use crate::client::state::Connection;
use crate::engine::ftp::FtpEngineProvider;
use crate::engine::EngineProvider;
use crate::error::ClientError;
use crate::navigate::{delete_command, entry_id};
use crate::settings::ConnectionConfig;
use crate::transfer::StagedUpload;

/// FTP/FTPS client keeping a current path over stateless requests.
///
/// Operations are strictly sequential; use one client per concurrent user.
pub struct FtpClient<P: EngineProvider = FtpEngineProvider> {
    provider: P,
    connection: Connection<P::Engine>,
}

impl FtpClient<FtpEngineProvider> {
    pub fn new() -> Self {
        Self::with_provider(FtpEngineProvider)
    }
}

impl Default for FtpClient<FtpEngineProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: EngineProvider> FtpClient<P> {
    pub fn with_provider(provider: P) -> Self {
        Self {
            provider,
            connection: Connection::default(),
        }
    }

    /// Connects using loosely typed arguments, see [`ConnectionConfig::from_map`].
    pub fn open(&mut self, args: &Map<String, Value>) -> Result<(), ClientError> {
        let config = ConnectionConfig::from_map(args)?;
        self.connect(config)
    }

    /// Acquires an engine, stores the session parameters and validates them
    /// with one directory listing.
    ///
    /// Any previous link is released first. On failure the client is left
    /// unconnected.
    pub fn connect(&mut self, config: ConnectionConfig) -> Result<(), ClientError> {
        config.validate()?;
        self.connection.disconnect();

        let engine = self.provider.acquire().map_err(ClientError::EngineInit)?;
        let options = config.connection_options();

        info!(
            "Connecting to {}://{}:{} as {} ({} mode)",
            config.scheme(),
            config.host,
            config.port,
            config.credentials.username,
            if config.use_passive_mode { "passive" } else { "active" }
        );

        self.connection
            .establish(config.host, config.use_tls, engine, options);

        if let Err(e) = self.connection.execute(None, None, Vec::new()) {
            self.connection.disconnect();
            return Err(e);
        }

        info!(
            "Connected to {}",
            self.connection.host().unwrap_or_default()
        );
        Ok(())
    }

    /// Releases the engine and resets host, TLS flag and path.
    pub fn close(&mut self) {
        if let Some(host) = self.connection.host() {
            info!("Closing connection to {}", host);
        }
        self.connection.reset();
    }

    /// Sets the current path. Local only.
    pub fn cd(&mut self, path: &str) {
        self.connection.set_current_path(path);
    }

    pub fn current_path(&self) -> &str {
        self.connection.current_path()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn connection(&self) -> &Connection<P::Engine> {
        &self.connection
    }

    /// Lists the current path in server order.
    ///
    /// Names that are not valid UTF-8 come back with U+FFFD in place of the
    /// offending bytes and will not resolve through `read` or `rm`.
    pub fn ls(&mut self) -> Result<Vec<RemoteEntry>, ClientError> {
        let body = self.connection.execute(None, None, Vec::new())?;
        let listing = String::from_utf8_lossy(&body);
        if let Cow::Owned(_) = listing {
            warn!(
                "Listing of {} is not valid UTF-8; undecodable bytes were replaced",
                self.connection.current_path()
            );
        }

        let current_path = self.connection.current_path();
        Ok(listing
            .trim()
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .filter(|name| !name.is_empty())
            .map(|name| RemoteEntry::new(name, entry_id(current_path, name)))
            .collect())
    }

    /// Fetches `file_name` from the current path.
    pub fn read(&mut self, file_name: &str) -> Result<Vec<u8>, ClientError> {
        self.connection.execute(Some(file_name), None, Vec::new())
    }

    /// Uploads `content` as `file_name` in the current path.
    ///
    /// The staged copy of the content is removed before returning, whatever
    /// the outcome of the upload.
    pub fn write(&mut self, file_name: &str, content: &[u8]) -> Result<(), ClientError> {
        if !self.connection.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let staged = StagedUpload::stage(content).map_err(ClientError::Staging)?;
        let result = staged
            .source()
            .map_err(ClientError::Staging)
            .and_then(|source| {
                self.connection
                    .execute(Some(file_name), Some(source), Vec::new())
            });
        staged.release();

        result.map(|_| ())
    }

    /// Deletes `file_name` from the current path.
    ///
    /// The `DELE` runs ahead of a listing of the current path, whose body is
    /// returned.
    pub fn rm(&mut self, file_name: &str) -> Result<Vec<u8>, ClientError> {
        let command = delete_command(self.connection.current_path(), file_name);
        self.connection.execute(None, None, vec![command])
    }
}
