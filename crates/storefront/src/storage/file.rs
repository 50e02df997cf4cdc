//! JSON file storage backend.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{DurableStore, StorageError};

/// [`DurableStore`] backed by a single JSON object file.
///
/// The file maps keys to string values:
///
/// ```json
/// { "cart": "[{\"id\":1,\"qty\":2,...}]" }
/// ```
///
/// Every write rewrites the whole file through a sibling temp file and a
/// rename, so readers never observe a half-written file. A missing or empty
/// file is an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (or prepare to create) the store at `path`.
    ///
    /// Creates the parent directory if needed. The file itself is created on
    /// the first write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(map).map_err(StorageError::Encode)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.read_map()?.into_keys().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ecomcloth-filestore-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let store = FileStore::open(scratch_path("storage.json")).unwrap();
        assert_eq!(store.get("cart").unwrap(), None);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_values_survive_reopen() {
        let path = scratch_path("storage.json");
        {
            let store = FileStore::open(&path).unwrap();
            store.set("cart", r#"[{"id":1}]"#).unwrap();
            store.set("theme", "dark").unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("cart").unwrap().as_deref(), Some(r#"[{"id":1}]"#));
        assert_eq!(reopened.keys().unwrap(), vec!["cart".to_string(), "theme".to_string()]);

        reopened.remove("cart").unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get("cart").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let path = scratch_path("storage.json");
        let store = FileStore::open(&path).unwrap();
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            store.get("cart"),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_empty_file_is_empty_store() {
        let path = scratch_path("storage.json");
        let store = FileStore::open(&path).unwrap();
        fs::write(&path, "").unwrap();
        assert_eq!(store.get("cart").unwrap(), None);
    }
}
