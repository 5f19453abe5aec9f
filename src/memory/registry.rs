use super::store::{MemoryStore, RemoteBinding};
use crate::config::{Config, MemoryConfig};
use crate::persistence::{FileMirror, LocalMirror, SqliteRemoteStore};
use crate::providers::{CompletionProvider, create_provider, resolve_api_key};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The active store, shared with whoever is driving the session.
pub type SharedMemoryStore = Arc<Mutex<MemoryStore>>;

const DEFAULT_PROVIDER: &str = "groq";

/// Builds fresh [`MemoryStore`]s that share one mirror, remote and provider.
#[derive(Clone)]
pub struct MemoryStoreFactory {
    config: MemoryConfig,
    mirror: Arc<dyn LocalMirror>,
    remote: Option<RemoteBinding>,
    provider: Arc<dyn CompletionProvider>,
}

impl MemoryStoreFactory {
    pub fn new(
        config: MemoryConfig,
        mirror: Arc<dyn LocalMirror>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            config,
            mirror,
            remote: None,
            provider,
        }
    }

    pub fn with_remote(mut self, remote: RemoteBinding) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Wire the file mirror, the provider and, when an identity is
    /// configured, the SQLite remote store.
    ///
    /// A remote store that cannot be opened is logged and skipped; the
    /// factory then produces local-only stores.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let provider_name = config
            .default_provider
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER);
        let api_key = resolve_api_key(provider_name, config.api_key.as_deref());
        let provider: Arc<dyn CompletionProvider> = Arc::from(create_provider(
            provider_name,
            api_key.as_deref(),
            config.default_temperature,
        )?);

        let mirror: Arc<dyn LocalMirror> = Arc::new(FileMirror::new(&config.data_dir()));
        let mut factory = Self::new(config.memory.clone(), mirror, provider);

        if let Some(user_id) = config.remote_identity() {
            let db_path = config.remote_db_path();
            match SqliteRemoteStore::open(&db_path).await {
                Ok(store) => {
                    factory = factory.with_remote(RemoteBinding::new(Arc::new(store), user_id));
                }
                Err(e) => {
                    tracing::warn!(
                        path = %db_path.display(),
                        error = %e,
                        "remote store unavailable; continuing with local mirror only"
                    );
                }
            }
        }

        Ok(factory)
    }

    pub fn provider(&self) -> Arc<dyn CompletionProvider> {
        Arc::clone(&self.provider)
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// A store bound to `session_id` with no history loaded.
    pub fn build(&self, session_id: &str) -> MemoryStore {
        let store = MemoryStore::new(
            session_id,
            self.config.clone(),
            Arc::clone(&self.mirror),
            Arc::clone(&self.provider),
        );
        match &self.remote {
            Some(remote) => store.with_remote(remote.clone()),
            None => store,
        }
    }

    /// A store bound to `session_id` with its history loaded.
    pub async fn open(&self, session_id: &str) -> MemoryStore {
        let mut store = self.build(session_id);
        store.load_session_messages(session_id).await;
        store
    }
}

/// Holds at most one active store.
///
/// Activating a different session discards the previous store; a store is
/// never rebound and reused across sessions through the registry.
pub struct MemoryRegistry {
    factory: MemoryStoreFactory,
    active: Option<(String, SharedMemoryStore)>,
}

impl MemoryRegistry {
    pub fn new(factory: MemoryStoreFactory) -> Self {
        Self {
            factory,
            active: None,
        }
    }

    pub fn factory(&self) -> &MemoryStoreFactory {
        &self.factory
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn active(&self) -> Option<SharedMemoryStore> {
        self.active.as_ref().map(|(_, store)| Arc::clone(store))
    }

    /// Return the store for `session_id`, loading a fresh one if another
    /// session (or none) is active.
    pub async fn activate(&mut self, session_id: &str) -> SharedMemoryStore {
        if let Some((id, store)) = &self.active
            && id == session_id
        {
            return Arc::clone(store);
        }

        if let Some((previous, _)) = self.active.take() {
            tracing::debug!(previous = %previous, next = session_id, "switching memory store");
        }
        let store = Arc::new(Mutex::new(self.factory.open(session_id).await));
        self.active = Some((session_id.to_string(), Arc::clone(&store)));
        store
    }

    pub fn deactivate(&mut self) {
        self.active = None;
    }
}
