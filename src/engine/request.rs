//! Transfer request records
//!
//! A `ConnectionOptions` value is built once per connection. Every operation
//! then builds a fresh `TransferRequest` on top of it and hands it to the
//! engine by value, so no option can outlive the request that needed it.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use url::{Host, Url};

use crate::error::{EngineError, NO_NATIVE_CODE, OptionKey};

/// Active-mode port sentinel: let the engine pick the interface and an
/// ephemeral port.
pub const ACTIVE_PORT_AUTO: &str = "-";

/// Bytes escaped when a remote path is written into a request URL. `/` stays
/// literal so it keeps separating segments.
const REMOTE_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Escapes `path` for a request URL; [`RemoteTarget::parse`] restores it.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, REMOTE_PATH).to_string()
}

/// Login credentials sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `user:password` form.
    pub fn userpwd(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// TLS settings for FTPS. Protection covers both the control and the data
/// channel, negotiated with the engine's default auth method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    pub verify_peer: bool,
    pub verify_host: bool,
}

impl TlsOptions {
    /// Accept any certificate and host name.
    pub fn permissive() -> Self {
        Self {
            verify_peer: false,
            verify_host: false,
        }
    }
}

/// Base options shared by every request of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub port: u16,
    pub credentials: Credentials,
    /// `None` disables the timeout.
    pub timeout: Option<Duration>,
    pub include_header: bool,
    pub return_transfer: bool,
    pub follow_location: bool,
    pub tls: Option<TlsOptions>,
    /// Active mode when set; passive mode otherwise.
    pub active_port: Option<String>,
}

impl ConnectionOptions {
    pub fn new(port: u16, credentials: Credentials, timeout_secs: u64) -> Self {
        Self {
            port,
            credentials,
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            include_header: false,
            return_transfer: true,
            follow_location: true,
            tls: None,
            active_port: None,
        }
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_active_port(mut self, port: impl Into<String>) -> Self {
        self.active_port = Some(port.into());
        self
    }

    /// Checks the values an engine cannot apply.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.port == 0 {
            return Err(EngineError::Option {
                option: OptionKey::Port,
                code: NO_NATIVE_CODE,
                message: "port must be between 1 and 65535".into(),
            });
        }

        match self.active_port.as_deref() {
            None | Some(ACTIVE_PORT_AUTO) => Ok(()),
            Some(other) => Err(EngineError::Option {
                option: OptionKey::FtpPort,
                code: NO_NATIVE_CODE,
                message: format!("unsupported active port specification: {other}"),
            }),
        }
    }
}

/// Readable upload body of known length.
pub struct UploadSource {
    reader: Box<dyn Read>,
    len: u64,
}

impl UploadSource {
    pub fn new(reader: Box<dyn Read>, len: u64) -> Self {
        Self { reader, len }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reader limited to the announced length.
    pub fn into_reader(self) -> std::io::Take<Box<dyn Read>> {
        self.reader.take(self.len)
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSource").field("len", &self.len).finish()
    }
}

/// One request: base options plus the per-operation settings.
#[derive(Debug)]
pub struct TransferRequest<'a> {
    pub options: &'a ConnectionOptions,
    pub url: String,
    pub list_only: bool,
    pub upload: Option<UploadSource>,
    /// Commands sent on the control channel before the transfer.
    pub quote: Vec<String>,
}

impl<'a> TransferRequest<'a> {
    pub fn new(options: &'a ConnectionOptions, url: String, list_only: bool) -> Self {
        Self {
            options,
            url,
            list_only,
            upload: None,
            quote: Vec::new(),
        }
    }

    pub fn with_upload(mut self, upload: UploadSource) -> Self {
        self.upload = Some(upload);
        self
    }

    pub fn with_quote(mut self, commands: Vec<String>) -> Self {
        self.quote = commands;
        self
    }

    pub fn is_upload(&self) -> bool {
        self.upload.is_some()
    }

    /// Parses the request URL into its remote target.
    pub fn target(&self) -> Result<RemoteTarget, EngineError> {
        RemoteTarget::parse(&self.url)
    }
}

/// Where a request goes: decoded host and path of an `ftp`/`ftps` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub secure: bool,
    pub host: String,
    /// Path without the URL's leading separator, percent-decoded.
    pub path: String,
}

impl RemoteTarget {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let url = Url::parse(raw).map_err(|e| url_error(format!("{raw}: {e}")))?;

        let secure = match url.scheme() {
            "ftp" => false,
            "ftps" => true,
            other => return Err(url_error(format!("unsupported scheme: {other}"))),
        };

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => return Err(url_error(format!("missing host: {raw}"))),
        };

        let encoded = url.path().strip_prefix('/').unwrap_or(url.path());
        let path = percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|e| url_error(format!("invalid path encoding: {e}")))?
            .into_owned();

        Ok(Self { secure, host, path })
    }
}

fn url_error(message: String) -> EngineError {
    EngineError::Option {
        option: OptionKey::Url,
        code: NO_NATIVE_CODE,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_render_as_userpwd_and_hide_password() {
        let credentials = Credentials::new("bob", "secret");
        assert_eq!(credentials.userpwd(), "bob:secret");
        assert!(!format!("{credentials:?}").contains("secret"));
    }

    #[test]
    fn base_options_disable_headers_and_upload() {
        let options = ConnectionOptions::new(21, Credentials::new("a", "b"), 30);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert!(!options.include_header);
        assert!(options.return_transfer);
        assert!(options.follow_location);
        assert!(options.tls.is_none());
        assert!(options.active_port.is_none());
    }

    #[test]
    fn zero_timeout_means_no_timeout() {
        let options = ConnectionOptions::new(21, Credentials::new("a", "b"), 0);
        assert_eq!(options.timeout, None);
    }

    #[test]
    fn validate_rejects_port_zero_and_fixed_active_ports() {
        let options = ConnectionOptions::new(0, Credentials::new("a", "b"), 30);
        assert!(matches!(
            options.validate(),
            Err(EngineError::Option {
                option: OptionKey::Port,
                ..
            })
        ));

        let options =
            ConnectionOptions::new(21, Credentials::new("a", "b"), 30).with_active_port("eth0");
        assert!(matches!(
            options.validate(),
            Err(EngineError::Option {
                option: OptionKey::FtpPort,
                ..
            })
        ));

        let options = ConnectionOptions::new(21, Credentials::new("a", "b"), 30)
            .with_active_port(ACTIVE_PORT_AUTO);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn parses_plain_and_secure_targets() {
        let target = RemoteTarget::parse("ftp://example.com/pub/a.txt").unwrap();
        assert!(!target.secure);
        assert_eq!(target.host, "example.com");
        assert_eq!(target.path, "pub/a.txt");

        let target = RemoteTarget::parse("ftps://example.com/pub/").unwrap();
        assert!(target.secure);
        assert_eq!(target.path, "pub/");
    }

    #[test]
    fn double_slash_keeps_the_absolute_root() {
        let target = RemoteTarget::parse("ftp://example.com//").unwrap();
        assert_eq!(target.path, "/");
    }

    #[test]
    fn path_is_percent_decoded() {
        let target = RemoteTarget::parse("ftp://example.com/my docs/a b.txt").unwrap();
        assert_eq!(target.path, "my docs/a b.txt");
    }

    #[test]
    fn encoded_paths_parse_back_to_the_same_name() {
        for path in ["x/report#1.txt", "what?/", "100%41.txt", "a b\\c", "/"] {
            let url = format!("ftp://example.com/{}", encode_path(path));
            assert_eq!(RemoteTarget::parse(&url).unwrap().path, path, "{url}");
        }
        assert_eq!(encode_path("x/report#1.txt"), "x/report%231.txt");
    }

    #[test]
    fn ipv6_hosts_lose_their_brackets() {
        let target = RemoteTarget::parse("ftp://[::1]/x").unwrap();
        assert_eq!(target.host, "::1");
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(matches!(
            RemoteTarget::parse("http://example.com/"),
            Err(EngineError::Option {
                option: OptionKey::Url,
                ..
            })
        ));
    }

    #[test]
    fn upload_reader_is_limited_to_len() {
        let source = UploadSource::new(Box::new(&b"hello world"[..]), 5);
        let mut body = Vec::new();
        source.into_reader().read_to_end(&mut body).unwrap();
        assert_eq!(body, b"hello");
    }

    #[test]
    fn request_defaults_to_no_upload_and_no_quote() {
        let options = ConnectionOptions::new(21, Credentials::new("a", "b"), 30);
        let request = TransferRequest::new(&options, "ftp://h/x".into(), false);
        assert!(!request.is_upload());
        assert!(request.quote.is_empty());
    }
}
