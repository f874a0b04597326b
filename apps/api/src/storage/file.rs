use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{DraftStore, StoreError};

/// One JSON file per key inside `dir`.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a reader never observes a half-written snapshot.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

/// `draft:edit:<id>` → `draft__edit__<id>`; anything outside
/// `[A-Za-z0-9_-]` becomes `_`.
fn file_stem(key: &str) -> String {
    key.replace(':', "__")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.path_for(key);
        let tmp = target.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &target).await?;
        debug!("Wrote {} bytes to {}", value.len(), target.display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
