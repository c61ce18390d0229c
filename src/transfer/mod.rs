//! Transfer helpers
//!
//! Prepares request bodies for uploads.

pub mod staging;

pub use staging::StagedUpload;
