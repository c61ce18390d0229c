//! Client result types
//!
//! Defines result structures returned by client operations.

use serde::{Deserialize, Serialize};

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Name as returned by the server
    pub text: String,
    /// Current path joined with the name
    pub id: String,
}

impl RemoteEntry {
    pub fn new(text: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            id: id.into(),
        }
    }
}
