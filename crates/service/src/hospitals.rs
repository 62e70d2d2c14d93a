//! CRUD operations over the hospital collection.
//!
//! Every operation loads the full collection from storage and, when it
//! mutates, writes the full collection back. A per-service `RwLock` keeps
//! mutations exclusive so two writers never work from the same snapshot.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::ServiceError;
use crate::record::{merge, record_id, Record, ID_FIELD};
use crate::storage::CollectionStorage;
use configs::IdStrategy;

pub const ENTITY: &str = "Hospital";
pub const DELETED_MESSAGE: &str = "Hospital deleted";

pub struct HospitalService {
    storage: Arc<dyn CollectionStorage>,
    id_strategy: IdStrategy,
    lock: RwLock<()>,
}

impl HospitalService {
    pub fn new(storage: Arc<dyn CollectionStorage>, id_strategy: IdStrategy) -> Self {
        Self { storage, id_strategy, lock: RwLock::new(()) }
    }

    /// The whole collection in stored order.
    pub async fn list(&self) -> Result<Vec<Record>, ServiceError> {
        let _guard = self.lock.read().await;
        self.storage.load().await
    }

    pub async fn get(&self, id: i64) -> Result<Record, ServiceError> {
        let _guard = self.lock.read().await;
        self.storage
            .load()
            .await?
            .into_iter()
            .find(|r| record_id(r) == Some(id))
            .ok_or_else(|| ServiceError::not_found(ENTITY))
    }

    /// Append `body` with a store-assigned id. A client-sent `id` is overwritten.
    pub async fn create(&self, mut body: Record) -> Result<Record, ServiceError> {
        let _guard = self.lock.write().await;
        let mut records = self.storage.load().await?;
        let id = self.next_id(&records)?;
        body.insert(ID_FIELD.to_string(), Value::from(id));
        records.push(body.clone());
        self.storage.save(&records).await?;
        info!(id, total = records.len(), "hospital created");
        Ok(body)
    }

    /// Merge `patch` into the record with `id` and persist.
    pub async fn update(&self, id: i64, patch: Record) -> Result<Record, ServiceError> {
        let _guard = self.lock.write().await;
        let mut records = self.storage.load().await?;
        let existing = records
            .iter_mut()
            .find(|r| record_id(r) == Some(id))
            .ok_or_else(|| ServiceError::not_found(ENTITY))?;
        merge(existing, patch);
        let updated = existing.clone();
        self.storage.save(&records).await?;
        info!(id, "hospital updated");
        Ok(updated)
    }

    /// Remove every record with `id`. Nothing is written when none matched.
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let _guard = self.lock.write().await;
        let mut records = self.storage.load().await?;
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() == before {
            debug!(id, "delete matched nothing");
            return Err(ServiceError::not_found(ENTITY));
        }
        self.storage.save(&records).await?;
        info!(id, total = records.len(), "hospital deleted");
        Ok(())
    }

    fn next_id(&self, records: &[Record]) -> Result<i64, ServiceError> {
        let base = match self.id_strategy {
            IdStrategy::Count => i64::try_from(records.len()).unwrap_or(i64::MAX),
            IdStrategy::MaxPlusOne => records.iter().filter_map(record_id).max().unwrap_or(0).max(0),
        };
        base.checked_add(1)
            .ok_or_else(|| ServiceError::Storage("id space exhausted".into()))
    }
}
