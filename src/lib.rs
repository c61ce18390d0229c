//! RAX FTP Client
//!
//! A minimal FTP/FTPS client. It keeps a current path and connection
//! parameters on the client side and turns every operation into one
//! independent transfer request.

pub mod client;
pub mod engine;
pub mod error;
pub mod navigate;
pub mod settings;
pub mod transfer;
pub mod utils;

pub use client::{FtpClient, RemoteEntry};
pub use engine::{EngineProvider, FtpEngineProvider, MemoryProvider, TransferEngine};
pub use error::{ClientError, EngineError, OptionKey};
pub use settings::{ConnectionConfig, Settings};
