//! Config store: named YAML documents on a pluggable backend.
//!
//! Loading is forgiving about absence (missing or empty documents yield the
//! caller's default) and strict about content (malformed documents are fatal).
//! Saving overwrites the whole document; there is no write coordination, so
//! concurrent savers are last-write-wins.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use keyportal_core::DomainError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse '{name}': {message}")]
    Parse { name: String, message: String },

    #[error("'{name}' is invalid: {source}")]
    Invalid {
        name: String,
        #[source]
        source: DomainError,
    },

    #[error("failed to serialize '{name}': {message}")]
    Serialize { name: String, message: String },

    #[error("failed to write '{name}': {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Whether this error came from persisting a document.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, StoreError::Write { .. } | StoreError::Serialize { .. })
    }
}

/// Raw storage of named text documents.
pub trait DocumentBackend: Send + Sync {
    /// Returns `Ok(None)` when the document does not exist.
    fn read(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Replace the document with `contents`.
    fn write(&self, name: &str, contents: &str) -> Result<(), StoreError>;
}

impl<S> DocumentBackend for Arc<S>
where
    S: DocumentBackend + ?Sized,
{
    fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
        (**self).read(name)
    }

    fn write(&self, name: &str, contents: &str) -> Result<(), StoreError> {
        (**self).write(name, contents)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File backend
// ─────────────────────────────────────────────────────────────────────────────

/// Documents are files directly under `root`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl DocumentBackend for FileBackend {
    fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_of(name)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Writes a sibling temp file and renames it over the target, so a failed
    /// write leaves the previous document intact.
    fn write(&self, name: &str, contents: &str) -> Result<(), StoreError> {
        let target = self.path_of(name);
        let tmp = self.path_of(&format!(".{name}.tmp"));
        let wrap = |source| StoreError::Write {
            name: name.to_string(),
            source,
        };

        if let Err(e) = fs::write(&tmp, contents) {
            let _ = fs::remove_file(&tmp);
            return Err(wrap(e));
        }
        fs::rename(&tmp, &target).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            wrap(e)
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory backend for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    inner: RwLock<HashMap<String, String>>,
    reject_writes: bool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose writes always fail (simulates an unwritable target).
    pub fn read_only() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }

    /// Seed a document, bypassing the write check.
    pub fn with_document(self, name: &str, contents: &str) -> Self {
        if let Ok(mut map) = self.inner.write() {
            map.insert(name.to_string(), contents.to_string());
        }
        self
    }
}

impl DocumentBackend for InMemoryBackend {
    fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Read {
            name: name.to_string(),
            source: io::Error::other("lock poisoned"),
        })?;
        Ok(map.get(name).cloned())
    }

    fn write(&self, name: &str, contents: &str) -> Result<(), StoreError> {
        let fail = |msg: &str| StoreError::Write {
            name: name.to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, msg.to_string()),
        };
        if self.reject_writes {
            return Err(fail("backend is read-only"));
        }
        let mut map = self.inner.write().map_err(|_| fail("lock poisoned"))?;
        map.insert(name.to_string(), contents.to_string());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed store
// ─────────────────────────────────────────────────────────────────────────────

/// Typed YAML load/save over a [`DocumentBackend`].
#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn DocumentBackend>,
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    pub fn files(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::new(root)))
    }

    pub fn in_memory(backend: InMemoryBackend) -> Self {
        Self::new(Arc::new(backend))
    }

    /// Load `name`, or `default` if it is missing or empty.
    ///
    /// "Empty" means whitespace only, a YAML null, or an empty mapping.
    pub fn load<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T, StoreError> {
        let Some(text) = self.backend.read(name)? else {
            tracing::debug!(document = name, "document missing; using default");
            return Ok(default);
        };

        let parse_err = |e: serde_yaml::Error| StoreError::Parse {
            name: name.to_string(),
            message: e.to_string(),
        };

        let value: serde_yaml::Value = if text.trim().is_empty() {
            serde_yaml::Value::Null
        } else {
            serde_yaml::from_str(&text).map_err(parse_err)?
        };

        match &value {
            serde_yaml::Value::Null => Ok(default),
            serde_yaml::Value::Mapping(m) if m.is_empty() => Ok(default),
            _ => serde_yaml::from_value(value).map_err(parse_err),
        }
    }

    /// Serialize `doc` and overwrite `name`.
    ///
    /// Field order follows the type definition and map order follows insertion;
    /// keys are never sorted.
    pub fn save<T: Serialize>(&self, name: &str, doc: &T) -> Result<(), StoreError> {
        let text = serde_yaml::to_string(doc).map_err(|e| StoreError::Serialize {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        self.backend.write(name, &text)?;
        tracing::info!(document = name, bytes = text.len(), "document saved");
        Ok(())
    }
}

impl core::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfigStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        items: IndexMap<String, u32>,
    }

    #[test]
    fn missing_document_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::files(dir.path());
        let doc: Doc = store.load("absent.yaml", Doc::default()).unwrap();
        assert_eq!(doc, Doc::default());
    }

    #[test]
    fn empty_or_null_document_yields_default() {
        for body in ["", "   \n", "~\n", "{}\n"] {
            let store = ConfigStore::in_memory(InMemoryBackend::new().with_document("d.yaml", body));
            let doc: Doc = store.load("d.yaml", Doc::default()).unwrap();
            assert_eq!(doc, Doc::default(), "body {body:?}");
        }
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let store = ConfigStore::in_memory(
            InMemoryBackend::new().with_document("d.yaml", "items: [unclosed\n"),
        );
        let err = store.load::<Doc>("d.yaml", Doc::default()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn missing_required_key_is_a_parse_error() {
        let store =
            ConfigStore::in_memory(InMemoryBackend::new().with_document("d.yaml", "other: 1\n"));
        let err = store.load::<Doc>("d.yaml", Doc::default()).unwrap_err();
        assert!(err.to_string().contains("items"));
    }

    #[test]
    fn save_then_load_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::files(dir.path());
        let mut doc = Doc::default();
        doc.items.insert("zeta".into(), 1);
        doc.items.insert("alpha".into(), 2);

        store.save("d.yaml", &doc).unwrap();

        let text = fs::read_to_string(dir.path().join("d.yaml")).unwrap();
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
        assert_eq!(store.load("d.yaml", Doc::default()).unwrap(), doc);
        assert!(!dir.path().join(".d.yaml.tmp").exists());
    }

    #[test]
    fn unwritable_target_is_a_write_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // A path nested under a regular file can never be created.
        let store = ConfigStore::files(file.path().join("nested"));
        let err = store.save("d.yaml", &Doc::default()).unwrap_err();
        assert!(err.is_write_failure());
    }

    #[test]
    fn failed_write_keeps_previous_document() {
        let store = ConfigStore::in_memory(
            InMemoryBackend::read_only().with_document("d.yaml", "items: {a: 1}\n"),
        );
        let err = store.save("d.yaml", &Doc::default()).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));

        let doc: Doc = store.load("d.yaml", Doc::default()).unwrap();
        assert_eq!(doc.items.get("a"), Some(&1));
    }
}
