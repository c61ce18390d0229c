//! Transfer engine
//!
//! The engine performs exactly one FTP exchange per request. The session
//! client owns one engine per connection and drives it strictly sequentially.

pub mod ftp;
pub mod memory;
pub mod request;

use crate::error::EngineError;

pub use ftp::{FtpEngine, FtpEngineProvider};
pub use memory::{MemoryEngine, MemoryProvider, RecordedRequest};
pub use request::{
    ACTIVE_PORT_AUTO, ConnectionOptions, Credentials, RemoteTarget, TlsOptions, TransferRequest,
    UploadSource,
};

/// Performs single request/response exchanges.
///
/// An empty body is a successful result. The handle is released when the
/// engine is dropped.
pub trait TransferEngine {
    fn perform(&mut self, request: TransferRequest<'_>) -> Result<Vec<u8>, EngineError>;
}

/// Hands out fresh engine handles.
pub trait EngineProvider {
    type Engine: TransferEngine;

    fn acquire(&self) -> Result<Self::Engine, EngineError>;
}
