//! Picking the payload entry out of an archive.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::ZipContext;
use crate::error::{Error, Result};
use crate::paths::{has_any_extension, is_supported_extension};
use crate::session::ArchiveSession;

impl ArchiveSession {
    /// Name of the first file entry, in archive order, whose extension is in
    /// `allowed`, or in [`DEFAULT_PAYLOAD_EXTENSIONS`](crate::DEFAULT_PAYLOAD_EXTENSIONS)
    /// when `allowed` is `None`.
    pub fn find_payload(&self, allowed: Option<&[&str]>) -> Result<String> {
        let entry = self
            .list_entries()?
            .iter()
            .filter(|entry| !entry.is_directory)
            .find(|entry| match allowed {
                Some(extensions) => has_any_extension(&entry.name, extensions),
                None => is_supported_extension(&entry.name),
            })
            .ok_or_else(|| Error::NoPayload(self.path().to_path_buf()))?;

        debug!(archive = %self.path().display(), payload = %entry.name, "found payload");
        Ok(entry.name.clone())
    }
}

impl ZipContext {
    /// Open `zip_path`, stage its payload, and close it again.
    ///
    /// The archive is closed before returning on every path.
    pub fn extract_payload_to_temp(
        &self,
        zip_path: impl AsRef<Path>,
        allowed: Option<&[&str]>,
    ) -> Result<PathBuf> {
        let session = self.open(zip_path)?;
        let staged = session
            .find_payload(allowed)
            .and_then(|name| session.extract_to_temp_file(&name));
        session.close();
        staged
    }
}
