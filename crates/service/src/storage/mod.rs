//! Storage abstractions for the service layer
//!
//! The collection is always read and written as a whole. Backends only move
//! bytes; ordering of load-mutate-save is the caller's job.

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::record::Record;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

/// Whole-collection persistence.
#[async_trait]
pub trait CollectionStorage: Send + Sync {
    async fn load(&self) -> Result<Vec<Record>, ServiceError>;
    async fn save(&self, records: &[Record]) -> Result<(), ServiceError>;
}
