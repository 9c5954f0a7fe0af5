//! Store backends that live inside the core crate.

mod memory;

pub use memory::MemoryStore;
