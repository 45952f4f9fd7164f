use std::path::{Component, Path, PathBuf};

use crate::{BoxFuture, ObjectStore, StorageError};

/// [`ObjectStore`] rooted at a local directory. Keys map to relative paths.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(key);
        let is_plain = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(rel))
    }
}

impl ObjectStore for LocalObjectStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Vec<u8>, StorageError>> {
        let key = key.to_owned();
        Box::pin(async move {
            let path = self.path_for(&key)?;
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(StorageError::NotFound(key))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        let key = key.to_owned();
        Box::pin(async move {
            let path = self.path_for(&key)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, body).await?;
            tracing::debug!(path = %path.display(), "wrote object");
            Ok(())
        })
    }

    fn locate(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}
