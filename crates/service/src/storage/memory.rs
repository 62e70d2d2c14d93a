use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CollectionStorage;
use crate::errors::ServiceError;
use crate::record::Record;

/// In-process collection; contents are lost on restart.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Vec<Record>>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_records(records: Vec<Record>) -> Arc<Self> {
        Arc::new(Self { inner: RwLock::new(records) })
    }
}

#[async_trait]
impl CollectionStorage for MemoryStorage {
    async fn load(&self) -> Result<Vec<Record>, ServiceError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, records: &[Record]) -> Result<(), ServiceError> {
        let mut guard = self.inner.write().await;
        *guard = records.to_vec();
        Ok(())
    }
}
