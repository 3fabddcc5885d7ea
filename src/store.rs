//! Durable key/value storage for persisted item order.
//!
//! A key maps to a JSON array of item ids. Reads never fail from the
//! caller's point of view: a missing key, an unreadable store or a value that
//! is not an array of strings all mean "no persisted order".

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("stored value is not an id array: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("storage is unavailable")]
    Unavailable,
}

/// String-keyed store with `getItem`/`setItem` semantics.
///
/// Methods take `&self`; stores shared between several grids use interior
/// mutability.
pub trait OrderStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: OrderStore + ?Sized> OrderStore for &T {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

impl<T: OrderStore + ?Sized> OrderStore for Rc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl OrderStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory. Colons in keys are
/// written as `%3A`.
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

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        // `%` never appears in a valid key, so the escape cannot collide
        Ok(self.dir.join(format!("{}.json", key.replace(':', "%3A"))))
    }
}

impl OrderStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Decode a stored value. Non-string entries are dropped; anything that is
/// not an array is an error.
pub fn decode_order(raw: &str) -> Result<Vec<String>, StorageError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let serde_json::Value::Array(entries) = value else {
        return Err(StorageError::Decode(serde::de::Error::custom(
            "expected a JSON array",
        )));
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            serde_json::Value::String(id) => Some(id.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|id| !id.is_empty())
        .collect())
}

/// Persisted order under `key`, or an empty list when there is none.
pub fn read_stored_order(store: &dyn OrderStore, key: &str) -> Vec<String> {
    let raw = match store.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(key, error = %err, "order read failed");
            return Vec::new();
        }
    };
    match decode_order(&raw) {
        Ok(ids) => ids,
        Err(err) => {
            debug!(key, error = %err, "ignoring corrupt stored order");
            Vec::new()
        }
    }
}

/// Write `ids` under `key`. An empty order removes the key.
pub fn write_stored_order(
    store: &dyn OrderStore,
    key: &str,
    ids: &[String],
) -> Result<(), StorageError> {
    if ids.is_empty() {
        return store.remove_item(key);
    }
    let encoded = serde_json::to_string(ids)?;
    store.set_item(key, &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl OrderStore for BrokenStore {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable)
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable)
        }

        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable)
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn memory_store_writes_json_array() {
        let store = MemoryStore::new();
        write_stored_order(&store, "dash", &ids(&["w2", "w3", "w1"])).unwrap();
        assert_eq!(
            store.get_item("dash").unwrap().as_deref(),
            Some(r#"["w2","w3","w1"]"#)
        );
        assert_eq!(read_stored_order(&store, "dash"), ids(&["w2", "w3", "w1"]));
    }

    #[test]
    fn empty_order_removes_key() {
        let store = MemoryStore::new();
        write_stored_order(&store, "dash", &ids(&["a"])).unwrap();
        write_stored_order(&store, "dash", &[]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_values_read_as_absent() {
        let store = MemoryStore::new();
        store.set_item("a", "{not json").unwrap();
        store.set_item("b", r#"{"order":["x"]}"#).unwrap();
        store.set_item("c", r#"["x", 3, null, "  ", " y "]"#).unwrap();
        assert!(read_stored_order(&store, "a").is_empty());
        assert!(read_stored_order(&store, "b").is_empty());
        assert_eq!(read_stored_order(&store, "c"), ids(&["x", "3", "y"]));
        assert!(read_stored_order(&store, "missing").is_empty());
    }

    #[test]
    fn failing_store_is_swallowed_on_read() {
        assert!(read_stored_order(&BrokenStore, "dash").is_empty());
        assert!(write_stored_order(&BrokenStore, "dash", &ids(&["a"])).is_err());
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("orders"));
        assert_eq!(store.get_item("layout:main").unwrap(), None);
        write_stored_order(&store, "layout:main", &ids(&["b", "a"])).unwrap();

        let reopened = FileStore::new(dir.path().join("orders"));
        assert_eq!(read_stored_order(&reopened, "layout:main"), ids(&["b", "a"]));

        reopened.remove_item("layout:main").unwrap();
        reopened.remove_item("layout:main").unwrap();
        assert_eq!(reopened.get_item("layout:main").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.set_item("../escape", "[]"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get_item(""),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn colon_and_underscore_keys_stay_apart() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        write_stored_order(&store, "a:b", &ids(&["x"])).unwrap();
        write_stored_order(&store, "a_b", &ids(&["y"])).unwrap();
        assert_eq!(read_stored_order(&store, "a:b"), ids(&["x"]));
        assert_eq!(read_stored_order(&store, "a_b"), ids(&["y"]));
        assert!(dir.path().join("a%3Ab.json").exists());
        assert!(dir.path().join("a_b.json").exists());
    }
}
