//! Content-addressed store of rendered equation images.

use forge_core::{EquationKind, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A flat directory of `<sha256-hex>.png` files.
///
/// Entries are written to a temporary file in the same directory and renamed
/// into place, so a reader never observes a partially written image.
#[derive(Debug, Clone)]
pub struct EquationCache {
    dir: PathBuf,
}

impl EquationCache {
    /// Open a cache rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for an equation: lowercase hex SHA-256 of kind and source.
    pub fn key(latex: &str, kind: EquationKind) -> String {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(latex.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Where the image for `key` lives, whether or not it exists yet.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.png", key))
    }

    /// Path of a complete cached image for `key`.
    pub fn lookup(&self, key: &str) -> Option<PathBuf> {
        let path = self.path_for(key);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
            _ => None,
        }
    }

    /// Copy `image` into the cache under `key` and return the cached path.
    pub fn store(&self, key: &str, image: &Path) -> Result<PathBuf> {
        let target = self.path_for(key);

        let mut staged = NamedTempFile::new_in(&self.dir)?;
        let mut source = File::open(image)?;
        io::copy(&mut source, &mut staged)?;
        staged.as_file().sync_all()?;
        staged.persist(&target).map_err(|e| e.error)?;

        log::debug!("cached equation image {}", target.display());
        Ok(target)
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
