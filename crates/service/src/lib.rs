//! Service layer for the hospital registry.
//! - `record`: the schema-less record model and request value parsing.
//! - `storage`: where the collection lives (JSON file or memory).
//! - `hospitals`: the CRUD operations, serialized per collection.

pub mod errors;
pub mod hospitals;
pub mod record;
pub mod storage;

pub use configs::IdStrategy;
