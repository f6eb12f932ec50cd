//! Blob stores: an in-memory map and a local directory tree.

use kg_types::{blob_key, BlobStore, StorageError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// In-memory [`BlobStore`] keyed by `item/[category/]file`.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>, StorageError> {
        self.blobs.lock().map_err(|e| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("failed to acquire lock: {}", e),
            ))
        })
    }
}

impl BlobStore for InMemoryBlobStore {
    fn save(
        &self,
        item_id: &str,
        path: &str,
        data: &[u8],
        category: Option<&str>,
    ) -> Result<String, StorageError> {
        let key = blob_key(item_id, path, category)?;
        self.lock()?.insert(key.clone(), data.to_vec());
        Ok(key)
    }

    fn get(&self, item_id: &str, path: &str, category: Option<&str>) -> Result<Vec<u8>, StorageError> {
        let key = blob_key(item_id, path, category)?;
        self.lock()?
            .get(&key)
            .cloned()
            .ok_or(StorageError::NotFound(key))
    }

    fn list(&self, item_id: &str, category: Option<&str>) -> Result<Vec<String>, StorageError> {
        let prefix = match category {
            Some(cat) => {
                kg_types::validate_category(cat)?;
                format!("{}/{}/", item_id, cat)
            }
            None => format!("{}/", item_id),
        };
        let mut out: Vec<String> = self
            .lock()?
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect();
        // top-level files first, then `category/file` entries
        out.sort_by_key(|key| key.contains('/'));
        Ok(out)
    }

    fn delete(&self, item_id: &str, path: &str, category: Option<&str>) -> Result<bool, StorageError> {
        let key = blob_key(item_id, path, category)?;
        Ok(self.lock()?.remove(&key).is_some())
    }
}

/// Filesystem [`BlobStore`] rooted at a base directory: `base/item/[category/]file`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    base_dir: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn full_path(&self, item_id: &str, path: &str, category: Option<&str>) -> Result<PathBuf, StorageError> {
        Ok(self.base_dir.join(blob_key(item_id, path, category)?))
    }

    fn files_in(dir: &std::path::Path) -> Result<Vec<String>, StorageError> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                out.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        out.sort();
        Ok(out)
    }
}

impl BlobStore for LocalBlobStore {
    fn save(
        &self,
        item_id: &str,
        path: &str,
        data: &[u8],
        category: Option<&str>,
    ) -> Result<String, StorageError> {
        let full = self.full_path(item_id, path, category)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, data)?;
        Ok(full.to_string_lossy().into_owned())
    }

    fn get(&self, item_id: &str, path: &str, category: Option<&str>) -> Result<Vec<u8>, StorageError> {
        let full = self.full_path(item_id, path, category)?;
        if !full.exists() {
            return Err(StorageError::NotFound(full.to_string_lossy().into_owned()));
        }
        Ok(std::fs::read(full)?)
    }

    /// Without a category, top-level files come first, then `category/file` entries.
    fn list(&self, item_id: &str, category: Option<&str>) -> Result<Vec<String>, StorageError> {
        let item_dir = self.base_dir.join(item_id);
        if !item_dir.exists() {
            return Ok(Vec::new());
        }
        if let Some(cat) = category {
            kg_types::validate_category(cat)?;
            let dir = item_dir.join(cat);
            return if dir.exists() {
                Self::files_in(&dir)
            } else {
                Ok(Vec::new())
            };
        }

        let mut out = Self::files_in(&item_dir)?;
        let mut categories = Vec::new();
        for entry in std::fs::read_dir(&item_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                categories.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        categories.sort();
        for cat in categories {
            for file in Self::files_in(&item_dir.join(&cat))? {
                out.push(format!("{}/{}", cat, file));
            }
        }
        Ok(out)
    }

    fn delete(&self, item_id: &str, path: &str, category: Option<&str>) -> Result<bool, StorageError> {
        let full = self.full_path(item_id, path, category)?;
        if !full.exists() {
            return Ok(false);
        }
        std::fs::remove_file(full)?;
        Ok(true)
    }
}
