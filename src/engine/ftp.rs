//! FTP transfer engine
//!
//! Performs each request over a logged-in control connection. The connection
//! is cached between requests to the same host and user and checked with NOOP
//! before it is reused; it is closed with QUIT when the engine is dropped.

use std::fmt;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, warn};
use suppaftp::native_tls::TlsConnector;
use suppaftp::types::FileType;
use suppaftp::{FtpError, Mode, NativeTlsConnector, NativeTlsFtpStream, Status};

use crate::engine::request::{ConnectionOptions, RemoteTarget, TlsOptions, TransferRequest};
use crate::engine::{EngineProvider, TransferEngine};
use crate::error::{EngineError, NO_NATIVE_CODE, OptionKey};

/// Provider of [`FtpEngine`] handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct FtpEngineProvider;

impl EngineProvider for FtpEngineProvider {
    type Engine = FtpEngine;

    fn acquire(&self) -> Result<FtpEngine, EngineError> {
        Ok(FtpEngine::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionKey {
    host: String,
    port: u16,
    secure: bool,
    username: String,
}

/// Engine speaking FTP and explicit FTPS.
///
/// `ftps` targets are secured with `AUTH TLS` on the configured port, then
/// `PROT P` for the data channel. Implicit FTPS servers (TLS from the first
/// byte, usually on port 990) are not supported.
#[derive(Default)]
pub struct FtpEngine {
    cached: Option<(SessionKey, NativeTlsFtpStream)>,
}

impl fmt::Debug for FtpEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpEngine")
            .field("cached", &self.cached.as_ref().map(|(key, _)| key))
            .finish()
    }
}

impl FtpEngine {
    fn checkout(
        &mut self,
        key: &SessionKey,
        options: &ConnectionOptions,
    ) -> Result<NativeTlsFtpStream, EngineError> {
        if let Some((cached_key, mut stream)) = self.cached.take() {
            if &cached_key == key && stream.noop().is_ok() {
                debug!("Reusing control connection to {}:{}", key.host, key.port);
                return Ok(stream);
            }
            close_session(stream);
        }

        open_session(key, options)
    }
}

impl TransferEngine for FtpEngine {
    fn perform(&mut self, request: TransferRequest<'_>) -> Result<Vec<u8>, EngineError> {
        request.options.validate()?;
        let target = request.target()?;
        let key = SessionKey {
            host: target.host.clone(),
            port: request.options.port,
            secure: target.secure,
            username: request.options.credentials.username.clone(),
        };

        let mut stream = self.checkout(&key, request.options)?;
        match run_request(&mut stream, &target, request) {
            Ok(body) => {
                self.cached = Some((key, stream));
                Ok(body)
            }
            Err(err) => {
                close_session(stream);
                Err(err)
            }
        }
    }
}

impl Drop for FtpEngine {
    fn drop(&mut self) {
        if let Some((key, stream)) = self.cached.take() {
            debug!("Releasing control connection to {}:{}", key.host, key.port);
            close_session(stream);
        }
    }
}

fn open_session(
    key: &SessionKey,
    options: &ConnectionOptions,
) -> Result<NativeTlsFtpStream, EngineError> {
    debug!(
        "Opening {} control connection to {}:{}",
        if key.secure { "FTPS" } else { "FTP" },
        key.host,
        key.port
    );

    let socket = connect_socket(key, options.timeout)?;
    set_socket_timeout(&socket, options.timeout)?;
    let mut stream = NativeTlsFtpStream::connect_with_stream(socket).map_err(transfer_error)?;

    if key.secure {
        let connector = tls_connector(options.tls.as_ref())?;
        stream = stream
            .into_secure(NativeTlsConnector::from(connector), &key.host)
            .map_err(transfer_error)?;
    }

    stream
        .login(
            options.credentials.username.as_str(),
            options.credentials.password.as_str(),
        )
        .map_err(transfer_error)?;
    stream
        .transfer_type(FileType::Binary)
        .map_err(transfer_error)?;

    Ok(stream)
}

/// Opens the control socket, bounded by `timeout` when one is set.
fn connect_socket(key: &SessionKey, timeout: Option<Duration>) -> Result<TcpStream, EngineError> {
    let addr = (key.host.as_str(), key.port);
    let Some(timeout) = timeout else {
        return TcpStream::connect(addr).map_err(connect_error);
    };

    let mut last_error = None;
    for candidate in addr.to_socket_addrs().map_err(connect_error)? {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(socket) => return Ok(socket),
            Err(e) => {
                debug!("Connecting to {} failed: {}", candidate, e);
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) => connect_error(e),
        None => EngineError::Transfer {
            code: NO_NATIVE_CODE,
            message: format!("no address found for {}", key.host),
        },
    })
}

fn close_session(mut stream: NativeTlsFtpStream) {
    if let Err(e) = stream.quit() {
        debug!("QUIT failed while closing control connection: {}", e);
    }
}

fn run_request(
    stream: &mut NativeTlsFtpStream,
    target: &RemoteTarget,
    request: TransferRequest<'_>,
) -> Result<Vec<u8>, EngineError> {
    apply_timeout(stream, request.options.timeout)?;
    stream.set_mode(if request.options.active_port.is_some() {
        Mode::Active
    } else {
        Mode::Passive
    });

    for command in &request.quote {
        run_quote(stream, command)?;
    }

    if request.list_only {
        let dir = (!target.path.is_empty()).then_some(target.path.as_str());
        return match stream.nlst(dir) {
            Ok(names) => Ok(names.join("\n").into_bytes()),
            // Servers answer NLST of an empty directory with 450.
            Err(FtpError::UnexpectedResponse(response))
                if response.status == Status::RequestFileActionIgnored =>
            {
                debug!("No entries in {}", target.path);
                Ok(Vec::new())
            }
            Err(e) => Err(transfer_error(e)),
        };
    }

    match request.upload {
        Some(upload) => {
            let expected = upload.len();
            let mut reader = upload.into_reader();
            let sent = stream
                .put_file(target.path.as_str(), &mut reader)
                .map_err(transfer_error)?;
            if sent != expected {
                warn!(
                    "Upload of {} sent {} bytes, expected {}",
                    target.path, sent, expected
                );
            }
            Ok(Vec::new())
        }
        None => stream
            .retr_as_buffer(target.path.as_str())
            .map(|cursor| cursor.into_inner())
            .map_err(transfer_error),
    }
}

fn run_quote(stream: &mut NativeTlsFtpStream, command: &str) -> Result<(), EngineError> {
    let (verb, arg) = command
        .split_once(' ')
        .map(|(verb, arg)| (verb, arg.trim()))
        .unwrap_or((command, ""));

    debug!("Sending pre-transfer command: {}", verb);
    match verb.to_ascii_uppercase().as_str() {
        "DELE" if !arg.is_empty() => stream.rm(arg).map_err(transfer_error),
        "NOOP" => stream.noop().map_err(transfer_error),
        _ => Err(EngineError::Option {
            option: OptionKey::Quote,
            code: NO_NATIVE_CODE,
            message: format!("unsupported pre-transfer command: {command}"),
        }),
    }
}

fn apply_timeout(
    stream: &NativeTlsFtpStream,
    timeout: Option<Duration>,
) -> Result<(), EngineError> {
    set_socket_timeout(stream.get_ref(), timeout)
}

fn set_socket_timeout(socket: &TcpStream, timeout: Option<Duration>) -> Result<(), EngineError> {
    socket
        .set_read_timeout(timeout)
        .and_then(|_| socket.set_write_timeout(timeout))
        .map_err(|e| EngineError::Option {
            option: OptionKey::Timeout,
            code: io_code(&e),
            message: e.to_string(),
        })
}

fn tls_connector(tls: Option<&TlsOptions>) -> Result<TlsConnector, EngineError> {
    let mut builder = TlsConnector::builder();
    if let Some(tls) = tls {
        builder.danger_accept_invalid_certs(!tls.verify_peer);
        builder.danger_accept_invalid_hostnames(!tls.verify_host);
    }

    builder.build().map_err(|e| EngineError::Option {
        option: OptionKey::UseSsl,
        code: NO_NATIVE_CODE,
        message: e.to_string(),
    })
}

fn io_code(err: &io::Error) -> i32 {
    err.raw_os_error().unwrap_or(NO_NATIVE_CODE)
}

fn connect_error(err: io::Error) -> EngineError {
    EngineError::Transfer {
        code: io_code(&err),
        message: err.to_string(),
    }
}

/// Reply code when the server answered, OS error number for socket failures.
fn transfer_error(err: FtpError) -> EngineError {
    let code = match &err {
        FtpError::UnexpectedResponse(response) => response.status.code() as i32,
        FtpError::ConnectionError(e) => io_code(e),
        _ => NO_NATIVE_CODE,
    };

    EngineError::Transfer {
        code,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::request::Credentials;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn rejects_unknown_schemes_before_connecting() {
        let options = ConnectionOptions::new(21, Credentials::new("anonymous", "x"), 5);
        let mut engine = FtpEngineProvider.acquire().unwrap();

        let err = engine
            .perform(TransferRequest::new(&options, "sftp://example.com/".into(), true))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Option {
                option: OptionKey::Url,
                ..
            }
        ));
    }

    #[test]
    fn rejects_port_zero_before_connecting() {
        let options = ConnectionOptions::new(0, Credentials::new("anonymous", "x"), 5);
        let mut engine = FtpEngineProvider.acquire().unwrap();

        let err = engine
            .perform(TransferRequest::new(&options, "ftp://127.0.0.1/".into(), true))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Option {
                option: OptionKey::Port,
                ..
            }
        ));
    }

    #[test]
    fn login_rejection_carries_the_reply_code() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (mut client, _) = listener.accept().unwrap();
            client.write_all(b"220 Welcome\r\n").unwrap();
            let mut reader = BufReader::new(client.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            client.write_all(b"530 Login incorrect.\r\n").unwrap();
            line
        });

        let options = ConnectionOptions::new(port, Credentials::new("bob", "wrong"), 5);
        let mut engine = FtpEngineProvider.acquire().unwrap();
        let err = engine
            .perform(TransferRequest::new(&options, "ftp://127.0.0.1/".into(), true))
            .unwrap_err();

        assert!(matches!(err, EngineError::Transfer { code: 530, .. }));
        assert!(handle.join().unwrap().starts_with("USER bob"));
    }

    #[test]
    fn silent_server_fails_within_the_timeout() {
        // Accepted by the backlog, never greeted.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let options = ConnectionOptions::new(port, Credentials::new("anonymous", "x"), 1);
        let mut engine = FtpEngineProvider.acquire().unwrap();
        let started = Instant::now();
        let err = engine
            .perform(TransferRequest::new(&options, "ftp://127.0.0.1/".into(), true))
            .unwrap_err();

        assert!(matches!(err, EngineError::Transfer { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
        drop(listener);
    }

    #[test]
    fn empty_directory_lists_as_empty_body() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (mut client, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(client.try_clone().unwrap());
            let mut data = None;
            let mut commands = Vec::new();
            client.write_all(b"220 Welcome\r\n").unwrap();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 {
                    break;
                }
                let line = line.trim_end().to_string();
                let reply = match line.split(' ').next().unwrap_or_default() {
                    "USER" => "331 Password required".to_string(),
                    "PASS" => "230 Logged in".to_string(),
                    "TYPE" => "200 Type set".to_string(),
                    "NOOP" => "200 OK".to_string(),
                    "PASV" => {
                        let passive = TcpListener::bind("127.0.0.1:0").unwrap();
                        let p = passive.local_addr().unwrap().port();
                        data = Some(passive);
                        format!("227 Entering Passive Mode (127,0,0,1,{},{})", p / 256, p % 256)
                    }
                    "NLST" => {
                        let (conn, _) = data.take().unwrap().accept().unwrap();
                        drop(conn);
                        "450 No files found".to_string()
                    }
                    "QUIT" => "221 Goodbye".to_string(),
                    _ => "502 Not implemented".to_string(),
                };
                client.write_all(format!("{reply}\r\n").as_bytes()).unwrap();
                commands.push(line);
                if reply.starts_with("221") {
                    break;
                }
            }
            commands
        });

        let options = ConnectionOptions::new(port, Credentials::new("anonymous", "x"), 5);
        let mut engine = FtpEngineProvider.acquire().unwrap();
        for _ in 0..2 {
            let body = engine
                .perform(TransferRequest::new(&options, "ftp://127.0.0.1/empty/".into(), true))
                .unwrap();
            assert!(body.is_empty());
        }
        drop(engine);

        assert_eq!(
            handle.join().unwrap(),
            vec![
                "USER anonymous",
                "PASS x",
                "TYPE I",
                "PASV",
                "NLST empty/",
                "NOOP",
                "PASV",
                "NLST empty/",
                "QUIT",
            ]
        );
    }
}
