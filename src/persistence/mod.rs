pub mod local;
pub mod remote;
pub mod sqlite;

pub use local::{FileMirror, InMemoryMirror, LocalMirror, mirror_key, read_state, write_state};
pub use remote::{RemoteSession, RemoteStore};
pub use sqlite::SqliteRemoteStore;
