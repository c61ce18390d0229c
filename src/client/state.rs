//! Module `state`
//!
//! Defines the `Connection` struct holding the state of one FTP session: the
//! established link (host, TLS flag, engine handle and base options) and the
//! current path used to resolve every relative operation.

use log::debug;

use crate::engine::request::{ConnectionOptions, TransferRequest, UploadSource, encode_path};
use crate::engine::TransferEngine;
use crate::error::ClientError;
use crate::navigate::{build_path, change_directory, is_blank};

const ROOT_PATH: &str = "/";

/// Link to a host, present only while connected.
struct Established<E> {
    host: String,
    use_tls: bool,
    engine: E,
    options: ConnectionOptions,
}

/// State of one logical FTP session.
///
/// Unconnected until a link is established; the engine handle lives exactly
/// as long as the link.
pub struct Connection<E> {
    current_path: String,
    established: Option<Established<E>>,
}

impl<E> Default for Connection<E> {
    fn default() -> Self {
        Self {
            current_path: ROOT_PATH.to_string(),
            established: None,
        }
    }
}

impl<E> Connection<E> {
    /// Stores a freshly acquired engine and its base options.
    pub(crate) fn establish(
        &mut self,
        host: String,
        use_tls: bool,
        engine: E,
        options: ConnectionOptions,
    ) {
        self.established = Some(Established {
            host,
            use_tls,
            engine,
            options,
        });
    }

    /// Drops the link and releases its engine. The current path is kept.
    pub(crate) fn disconnect(&mut self) -> bool {
        self.established.take().is_some()
    }

    /// Back to the unconnected default state.
    pub fn reset(&mut self) {
        self.disconnect();
        self.current_path = ROOT_PATH.to_string();
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn is_connected(&self) -> bool {
        self.established.is_some()
    }

    pub fn host(&self) -> Option<&str> {
        self.established.as_ref().map(|link| link.host.as_str())
    }

    /// False while unconnected.
    pub fn use_tls(&self) -> bool {
        self.established.as_ref().is_some_and(|link| link.use_tls)
    }

    pub fn options(&self) -> Option<&ConnectionOptions> {
        self.established.as_ref().map(|link| &link.options)
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    // --------------------
    // Setter methods
    // --------------------

    pub fn set_current_path(&mut self, path: &str) {
        change_directory(&mut self.current_path, path);
    }

    // --------------------
    // Remote locations
    // --------------------

    pub fn scheme(&self) -> &'static str {
        if self.use_tls() { "ftps" } else { "ftp" }
    }

    pub fn build_path(&self, file_name: Option<&str>) -> String {
        build_path(&self.current_path, file_name)
    }

    /// Request URL for `file_name`. The path is percent-encoded, so names
    /// holding `#`, `?` or `%` reach the server unchanged.
    pub fn build_url(&self, file_name: Option<&str>) -> Result<String, ClientError> {
        let host = self.host().ok_or(ClientError::NotConnected)?;
        Ok(format!(
            "{}://{}/{}",
            self.scheme(),
            host,
            encode_path(&self.build_path(file_name))
        ))
    }
}

impl<E: TransferEngine> Connection<E> {
    /// Performs one request for `file_name` (a listing when blank).
    pub(crate) fn execute(
        &mut self,
        file_name: Option<&str>,
        upload: Option<UploadSource>,
        quote: Vec<String>,
    ) -> Result<Vec<u8>, ClientError> {
        let path = self.build_path(file_name);
        let url = self.build_url(file_name)?;
        let list_only = is_blank(file_name);

        let link = self.established.as_mut().ok_or(ClientError::NotConnected)?;
        let mut request = TransferRequest::new(&link.options, url, list_only).with_quote(quote);
        if let Some(upload) = upload {
            request = request.with_upload(upload);
        }

        debug!(
            "{} {} (list_only: {}, upload: {}, quote: {})",
            link.host,
            path,
            request.list_only,
            request.is_upload(),
            request.quote.len()
        );

        link.engine
            .perform(request)
            .map_err(|e| ClientError::from_engine(&path, e))
    }
}
