//! Key-value transport for envelopes.
//!
//! The codec never touches storage directly. Producers `put` an encoded
//! envelope under a key, consumers `get` it back; what sits behind the trait
//! is up to the host.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Key of the demonstration persistence slot.
pub const DEFAULT_SLOT: &str = "serializedCounter";

/// Storage for encoded envelopes.
pub trait EnvelopeStore: Send + Sync {
    /// Store `envelope` under `key`, replacing any previous value.
    fn put(&self, key: &str, envelope: &str) -> Result<(), TransportError>;

    /// Fetch the envelope stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, TransportError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvelopeStore for MemoryStore {
    fn put(&self, key: &str, envelope: &str) -> Result<(), TransportError> {
        validate_key(key)?;
        self.entries
            .write()
            .map_err(|_| TransportError::Poisoned)?
            .insert(key.to_string(), envelope.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        validate_key(key)?;
        Ok(self
            .entries
            .read()
            .map_err(|_| TransportError::Poisoned)?
            .get(key)
            .cloned())
    }
}

/// Store keeping one `<key>.json` file per slot in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, TransportError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Slot key for a file inside the store directory, if it is one.
    pub fn key_for(&self, path: &Path) -> Option<String> {
        if path.parent()? != self.dir.as_path() {
            return None;
        }
        if path.extension()?.to_str()? != "json" {
            return None;
        }
        let key = path.file_stem()?.to_str()?;
        validate_key(key).ok()?;
        Some(key.to_string())
    }
}

impl EnvelopeStore for FileStore {
    fn put(&self, key: &str, envelope: &str) -> Result<(), TransportError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        // Write then rename so readers never see a partial envelope
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, envelope)?;
        fs::rename(&tmp, &path)?;

        tracing::info!("Stored envelope in {}", path.display());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_key(key: &str) -> Result<(), TransportError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(TransportError::InvalidKey(key.to_string()))
    }
}

/// Errors that can occur reading or writing envelopes.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid slot key: {0:?}")]
    InvalidKey(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}
