use std::{ffi::OsString, path::{Path, PathBuf}, sync::Arc};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::CollectionStorage;
use crate::errors::ServiceError;
use crate::record::Record;

/// JSON file holding the collection as one pretty-printed array.
pub struct JsonFileStorage {
    file_path: PathBuf,
}

impl JsonFileStorage {
    /// Initialize the storage from a path. Creates the file with an empty array if missing.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(ServiceError::storage)?;
        }

        if fs::metadata(&file_path).await.is_err() {
            info!(path = %file_path.display(), "collection file missing; starting empty");
            let storage = Self { file_path };
            storage.save(&[]).await?;
            return Ok(Arc::new(storage));
        }

        Ok(Arc::new(Self { file_path }))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.file_path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl CollectionStorage for JsonFileStorage {
    async fn load(&self) -> Result<Vec<Record>, ServiceError> {
        let bytes = fs::read(&self.file_path).await.map_err(|e| {
            ServiceError::Storage(format!("read {}: {e}", self.file_path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ServiceError::Storage(format!("parse {}: {e}", self.file_path.display()))
        })
    }

    /// Write to a sibling temp file, then rename over the target.
    async fn save(&self, records: &[Record]) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(records).map_err(ServiceError::storage)?;
        let tmp = self.temp_path();
        fs::write(&tmp, &data).await.map_err(|e| {
            ServiceError::Storage(format!("write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.file_path).await.map_err(|e| {
            ServiceError::Storage(format!("rename into {}: {e}", self.file_path.display()))
        })?;
        debug!(path = %self.file_path.display(), records = records.len(), "collection saved");
        Ok(())
    }
}
