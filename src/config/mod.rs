pub mod schema;

pub use schema::{Config, IdentityConfig, MemoryConfig, StorageConfig};
