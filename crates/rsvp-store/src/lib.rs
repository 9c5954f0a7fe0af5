//! Durable `redb` implementation of the reader's persistence boundary.

mod error;
mod redb_store;

pub use error::StoreError;
pub use redb_store::RedbStore;
