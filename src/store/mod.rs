mod error;
mod memory;
mod version_store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use version_store::{VersionStore, VersionWrite};
