use crate::config::Rule;
use crate::naming::{NamingError, NamingPolicy};
use crate::upload::storage::{ObjectStore, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} has no file name")]
    NoFileName(PathBuf),

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("upload to bucket {bucket}, key {key} failed: {source}")]
    Storage {
        bucket: String,
        key: String,
        source: StorageError,
    },
}

/// The object key for `name` under a rule's destination prefix.
pub fn object_key(dest: &str, name: &str) -> String {
    format!("{dest}/{name}")
}

/// Ships one selected file to the rule's bucket.
#[derive(Clone)]
pub struct Uploader {
    naming: Arc<NamingPolicy>,
    store: Arc<dyn ObjectStore>,
}

impl Uploader {
    pub fn new(naming: Arc<NamingPolicy>, store: Arc<dyn ObjectStore>) -> Self {
        Self { naming, store }
    }

    /// Uploads `path` to `rule.bucket` and returns the key it was stored under.
    ///
    /// - Returns [`UploadError::Stat`] if the file is gone, before anything is sent.
    /// - Returns [`UploadError::Naming`] if the naming policy fails.
    /// - Returns [`UploadError::Storage`] if the store rejects the object. Nothing is retried.
    pub async fn upload(&self, path: &Path, rule: &Rule) -> Result<String, UploadError> {
        tokio::fs::symlink_metadata(path)
            .await
            .map_err(|source| UploadError::Stat {
                path: path.to_path_buf(),
                source,
            })?;

        let original = path
            .file_name()
            .ok_or_else(|| UploadError::NoFileName(path.to_path_buf()))?
            .to_string_lossy();

        let name = self.naming.resolve(&original, rule)?;
        let key = object_key(&rule.dest, &name);

        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|source| UploadError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        self.store
            .put(&rule.bucket, &key, &mut file)
            .await
            .map_err(|source| UploadError::Storage {
                bucket: rule.bucket.clone(),
                key: key.clone(),
                source,
            })?;

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::object_key;

    #[test]
    fn key_joins_with_a_single_separator() {
        assert_eq!(object_key("parent_hoge", "hoge.log"), "parent_hoge/hoge.log");
        assert_eq!(object_key("a/b/", "c"), "a/b//c");
        assert_eq!(object_key("", "c"), "/c");
    }
}
