//! Navigate module
//!
//! Client-side bookkeeping of the current path and the remote paths and
//! entry ids derived from it. Nothing here touches the network.

mod operations;

// Re-export public functions
pub use operations::{build_path, change_directory, delete_command, entry_id, is_blank};
