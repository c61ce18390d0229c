//! Upload staging
//!
//! Upload content is written to a temporary file first so the engine reads
//! it as a stream of known length. The file belongs to a single `write` call
//! and is removed before that call returns.

use std::io::{self, Write};
use std::path::Path;

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::engine::request::UploadSource;

/// Temporary file holding one upload body.
pub struct StagedUpload {
    file: NamedTempFile,
    len: u64,
}

impl StagedUpload {
    /// Writes `content` to a fresh temporary file.
    pub fn stage(content: &[u8]) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("rax-ftp-upload-")
            .tempfile()?;
        file.write_all(content)?;
        file.flush()?;

        debug!(
            "Staged {} upload bytes in {}",
            content.len(),
            file.path().display()
        );

        Ok(Self {
            file,
            len: content.len() as u64,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Independent reader positioned at the start of the staged content.
    pub fn source(&self) -> io::Result<UploadSource> {
        let reader = self.file.reopen()?;
        Ok(UploadSource::new(Box::new(reader), self.len))
    }

    /// Closes and deletes the temporary file. Failures are only logged.
    pub fn release(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            warn!(
                "Failed to remove staged upload {}: {}",
                path.display(),
                e
            );
        }
    }
}
