// Artifact Storage
// Named slots holding one opaque classifier blob each

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::services::errors::StorageError;

pub trait ArtifactStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// `Ok(None)` when nothing has been stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn exists(&self, key: &str) -> bool;

    /// Human-readable location, for logs.
    fn describe(&self, key: &str) -> String;
}

/// One `<key>.json` file per slot inside a directory.
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn io_error(key: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl ArtifactStore for FileArtifactStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(key, e))?;

        // Write beside the target, then rename over it so readers never see a partial file.
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{}.json.tmp", key));
        let result = fs::write(&staging, bytes).and_then(|_| fs::rename(&staging, &target));
        if let Err(e) = result {
            let _ = fs::remove_file(&staging);
            return Err(Self::io_error(key, e));
        }

        debug!("[STORE] Wrote {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    fn describe(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}

#[derive(Default)]
pub struct MemoryArtifactStore {
    slots: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.slots.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.slots.read().get(key).cloned())
    }

    fn exists(&self, key: &str) -> bool {
        self.slots.read().contains_key(key)
    }

    fn describe(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}
