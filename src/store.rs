//! Durable credential persistence.
//!
//! One opaque blob per strategy kind, stored under the credentials
//! directory and overwritten atomically (temp file + rename) so an
//! interrupted refresh never leaves a half-written credential behind.
//! The store never interprets blob contents; encoding belongs to the
//! strategy that owns the credential.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::credential::StrategyKind;
use crate::error::{Error, Result};

/// File-backed store keyed by strategy kind.
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Create a store rooted at the given credentials directory. The
    /// directory is created lazily on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The credentials directory this store reads and writes.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, kind: StrategyKind) -> PathBuf {
        self.dir.join(kind.token_file_name())
    }

    /// Load the persisted blob for a strategy, if any.
    pub fn load(&self, kind: StrategyKind) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(kind);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Store(format!("read {}: {e}", path.display()))),
        }
    }

    /// Persist a blob for a strategy, replacing any previous one.
    pub fn save(&self, kind: StrategyKind, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Store(format!("create {}: {e}", self.dir.display())))?;

        let path = self.blob_path(kind);
        let tmp = self.dir.join(format!(".{}.tmp", kind.token_file_name()));

        // The temp file must not survive a failed write or rename.
        let cleanup = scopeguard::guard(tmp.clone(), |t| {
            let _ = fs::remove_file(t);
        });

        fs::write(&tmp, bytes)
            .map_err(|e| Error::Store(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Store(format!("rename into {}: {e}", path.display())))?;

        let _ = scopeguard::ScopeGuard::into_inner(cleanup);
        debug!(strategy = %kind, path = %path.display(), "persisted credential blob");
        Ok(())
    }

    /// Remove the persisted blob for a strategy. Missing blobs are not an
    /// error.
    pub fn clear(&self, kind: StrategyKind) -> Result<()> {
        let path = self.blob_path(kind);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Store(format!("remove {}: {e}", path.display()))),
        }
    }
}
