//! Error handling
//!
//! Defines error types and reporting for the FTP client.

pub mod handlers;
pub mod types;

pub use types::*;
