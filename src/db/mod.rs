//! Database layer for ContentValidator
//!
//! - `mongo`: MongoDB client and typed collection wrapper
//! - `schemas`: document structures and indexes
//! - `store`: MongoDB implementations of the store traits
//! - `memory`: in-process implementations for dev mode and tests

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::{MongoClient, MongoCollection};
pub use store::MongoStore;
