//! Blob storage seam used to persist graphs and subgraphs.

use std::path::Path;

/// File extension used for persisted subgraphs.
pub const SUBGRAPH_FILE_EXTENSION: &str = ".subgraph.json";

/// Object storage addressed by an item id and an optional category namespace.
pub trait BlobStore: Send + Sync {
    /// Store `data` at `path`; returns the resolved location.
    fn save(
        &self,
        item_id: &str,
        path: &str,
        data: &[u8],
        category: Option<&str>,
    ) -> Result<String, StorageError>;

    fn get(&self, item_id: &str, path: &str, category: Option<&str>) -> Result<Vec<u8>, StorageError>;

    /// Paths stored under the item (and category, when given).
    fn list(&self, item_id: &str, category: Option<&str>) -> Result<Vec<String>, StorageError>;

    /// Returns whether something was deleted.
    fn delete(&self, item_id: &str, path: &str, category: Option<&str>) -> Result<bool, StorageError>;
}

/// Reject category names that could escape their namespace.
pub fn validate_category(category: &str) -> Result<(), StorageError> {
    if category.is_empty()
        || category == "."
        || category == ".."
        || category
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
    {
        return Err(StorageError::InvalidParameter(format!(
            "invalid category name: {:?}",
            category
        )));
    }
    Ok(())
}

/// Replace path separators and spaces so a display name is usable as a file name.
pub fn normalize_file_name(name: &str) -> String {
    name.replace(['\\', '/', ' '], "_")
}

/// `<normalized name>.subgraph.json`, unless the extension is already present.
pub fn subgraph_file_name(name: &str) -> String {
    let normalized = normalize_file_name(name);
    if normalized.ends_with(SUBGRAPH_FILE_EXTENSION) {
        normalized
    } else {
        format!("{}{}", normalized, SUBGRAPH_FILE_EXTENSION)
    }
}

/// Storage key combining item id, optional category and path.
pub fn blob_key(item_id: &str, path: &str, category: Option<&str>) -> Result<String, StorageError> {
    let file = Path::new(path)
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| StorageError::InvalidParameter(format!("invalid path: {:?}", path)))?;
    match category {
        Some(cat) => {
            validate_category(cat)?;
            Ok(format!("{}/{}/{}", item_id, cat, file))
        }
        None => Ok(format!("{}/{}", item_id, file)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
