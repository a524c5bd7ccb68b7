//! Backend implementations of the synchronous key-value tier.
//!
//! The filesystem backend is used by the application; the memory backend
//! keeps everything in process and can enforce a byte quota.

pub mod filesystem;
pub mod memory;

pub use filesystem::FileKeyValueStorage;
pub use memory::MemoryKeyValueStorage;
