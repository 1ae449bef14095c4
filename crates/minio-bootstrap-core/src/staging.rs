//! Transient on-disk copy of the policy document.
//!
//! The policy is written to a temporary file before it is uploaded, and that
//! file must be gone when the run ends, whatever the outcome. [`StagedPolicy`]
//! owns the file: [`StagedPolicy::remove`] deletes it explicitly and `Drop`
//! deletes it on every other path, including early returns and panics.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::policy::PolicyDocument;

/// A policy document written to a temporary JSON file.
#[derive(Debug)]
pub struct StagedPolicy {
    file: NamedTempFile,
}

impl StagedPolicy {
    /// Write `document` to a new temporary file.
    ///
    /// The file is created in `dir`, or in the system temporary directory
    /// when `dir` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or written.
    pub fn stage(document: &PolicyDocument, dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("app-policy-").suffix(".json");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        file.write_all(&document.to_json()?)?;
        file.flush()?;
        debug!(path = %file.path().display(), "staged policy document");

        Ok(Self { file })
    }

    /// Location of the staged file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the staged document back.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.path()).await
    }

    /// Delete the staged file, reporting failures.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file could not be removed.
    pub fn remove(self) -> io::Result<()> {
        let path = self.path().to_path_buf();
        self.file.close()?;
        debug!(path = %path.display(), "removed staged policy document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_write_document_into_requested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let doc = PolicyDocument::for_bucket("photos");

        let staged = StagedPolicy::stage(&doc, Some(dir.path())).unwrap();
        assert!(staged.path().starts_with(dir.path()));
        assert_eq!(staged.read().await.unwrap(), doc.to_json().unwrap());
    }

    #[test]
    fn test_should_delete_file_on_remove() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedPolicy::stage(&PolicyDocument::for_bucket("photos"), Some(dir.path()))
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        staged.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_should_delete_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let staged =
                StagedPolicy::stage(&PolicyDocument::for_bucket("photos"), Some(dir.path()))
                    .unwrap();
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_should_fail_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(StagedPolicy::stage(&PolicyDocument::for_bucket("photos"), Some(&missing)).is_err());
    }
}
