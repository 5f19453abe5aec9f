use crate::memory::{MemorySnapshot, Message};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// A session row in the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Async row store shared across devices.
///
/// Every call is scoped by the authenticated `user_id`; rows owned by other
/// users are invisible and cannot be written.
pub trait RemoteStore: Send + Sync {
    fn name(&self) -> &str;

    /// Insert the session row if it does not exist yet.
    fn ensure_session<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
        title: &'a str,
        parent_id: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn get_session<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<RemoteSession>>> + Send + 'a>>;

    /// Sessions that declare `parent_id` as their parent, oldest first.
    fn list_child_sessions<'a>(
        &'a self,
        user_id: &'a str,
        parent_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteSession>>> + Send + 'a>>;

    /// Messages of a session in chronological order.
    fn list_messages<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Message>>> + Send + 'a>>;

    fn insert_message<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
        message: &'a Message,
        metadata: Option<serde_json::Value>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn delete_message<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
        message_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

    fn insert_snapshot<'a>(
        &'a self,
        user_id: &'a str,
        snapshot: &'a MemorySnapshot,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Snapshots of a session in creation order.
    fn list_snapshots<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<MemorySnapshot>>> + Send + 'a>>;
}
