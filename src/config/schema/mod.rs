mod core;
mod memory;
mod storage;

pub use self::core::{Config, IdentityConfig};
pub use memory::MemoryConfig;
pub use storage::StorageConfig;
