#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use convokit::config::MemoryConfig;
use convokit::memory::{MemorySnapshot, MemoryStore, Message, RemoteBinding};
use convokit::persistence::{InMemoryMirror, RemoteSession, RemoteStore, SqliteRemoteStore};
use convokit::providers::{CompletionMessage, CompletionProvider};

pub const SESSION: &str = "session-under-test";
pub const USER: &str = "user-1";

/// Replies from a queue, then repeats the fallback reply.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete<'a>(
        &'a self,
        _messages: &'a [CompletionMessage],
        _model: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()));
        Box::pin(async move { next.map_err(|e| anyhow::anyhow!(e)) })
    }
}

/// Remote store whose every call fails, counting attempts.
#[derive(Default)]
pub struct FailingRemote {
    calls: AtomicUsize,
}

impl FailingRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<'a, T: Send + 'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(anyhow::anyhow!("remote store unreachable")) })
    }
}

impl RemoteStore for FailingRemote {
    fn name(&self) -> &str {
        "failing"
    }

    fn ensure_session<'a>(
        &'a self,
        _user_id: &'a str,
        _session_id: &'a str,
        _title: &'a str,
        _parent_id: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        self.fail()
    }

    fn get_session<'a>(
        &'a self,
        _user_id: &'a str,
        _session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<RemoteSession>>> + Send + 'a>> {
        self.fail()
    }

    fn list_child_sessions<'a>(
        &'a self,
        _user_id: &'a str,
        _parent_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteSession>>> + Send + 'a>> {
        self.fail()
    }

    fn list_messages<'a>(
        &'a self,
        _user_id: &'a str,
        _session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Message>>> + Send + 'a>> {
        self.fail()
    }

    fn insert_message<'a>(
        &'a self,
        _user_id: &'a str,
        _session_id: &'a str,
        _message: &'a Message,
        _metadata: Option<serde_json::Value>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        self.fail()
    }

    fn delete_message<'a>(
        &'a self,
        _user_id: &'a str,
        _session_id: &'a str,
        _message_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        self.fail()
    }

    fn insert_snapshot<'a>(
        &'a self,
        _user_id: &'a str,
        _snapshot: &'a MemorySnapshot,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        self.fail()
    }

    fn list_snapshots<'a>(
        &'a self,
        _user_id: &'a str,
        _session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<MemorySnapshot>>> + Send + 'a>> {
        self.fail()
    }
}

pub fn manual_snapshots(max_context_size: usize) -> MemoryConfig {
    MemoryConfig {
        max_context_size,
        long_term_memory_enabled: false,
        ..MemoryConfig::default()
    }
}

pub fn local_store(config: MemoryConfig, provider: Arc<ScriptedProvider>) -> MemoryStore {
    MemoryStore::new(SESSION, config, Arc::new(InMemoryMirror::new()), provider)
}

pub fn with_failing_remote(store: MemoryStore) -> (MemoryStore, Arc<FailingRemote>) {
    let remote = FailingRemote::new();
    let store = store.with_remote(RemoteBinding::new(remote.clone(), USER));
    (store, remote)
}

pub async fn sqlite_remote() -> Arc<SqliteRemoteStore> {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should open");
    Arc::new(
        SqliteRemoteStore::new(pool)
            .await
            .expect("schema should initialize"),
    )
}

/// Alternate user/assistant turns, `"turn {i}"`.
pub fn turns(count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("turn {i}"))
            } else {
                Message::assistant(format!("turn {i}"))
            }
        })
        .collect()
}

pub async fn save_all(store: &mut MemoryStore, messages: Vec<Message>) {
    for message in messages {
        store.save_message(message).await;
    }
}

pub fn contents(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.content.clone()).collect()
}
