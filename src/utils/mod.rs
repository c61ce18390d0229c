//! Utility functions
//!
//! Provides logging setup and settings validation helpers.

pub mod logging;
pub mod validation;
