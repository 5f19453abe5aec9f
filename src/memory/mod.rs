pub mod context;
pub mod registry;
pub mod store;
pub mod summarize;
pub mod types;

pub use context::{SUMMARY_PREFIX, build_context_window};
pub use registry::{MemoryRegistry, MemoryStoreFactory, SharedMemoryStore};
pub use store::{MemoryStore, RemoteBinding};
pub use summarize::{fallback_summary, summarize};
pub use types::{ConversationBranch, MemorySnapshot, Message, Role, SerializedState};
