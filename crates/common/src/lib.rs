//! Shared plumbing for the registry crates: logging setup and the small
//! wire types every layer agrees on.

pub mod types;
pub mod utils;
