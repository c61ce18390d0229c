//! Client session
//!
//! Maps the stateful view of an FTP session (one host, one current path)
//! onto independent transfer requests.

pub mod results;
pub mod session;
pub mod state;

pub use results::RemoteEntry;
pub use session::FtpClient;
pub use state::Connection;
