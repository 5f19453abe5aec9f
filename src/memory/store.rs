//! The conversation memory store.
//!
//! One [`MemoryStore`] owns a single session: its ordered messages, summary
//! snapshots and branch records. The in-memory state is authoritative; the
//! local mirror and the optional remote store are written best-effort and
//! their failures are logged, never returned.

use super::context::build_context_window;
use super::summarize::summarize;
use super::types::{ConversationBranch, MemorySnapshot, Message, Role, SerializedState};
use crate::config::MemoryConfig;
use crate::persistence::{LocalMirror, RemoteStore, read_state, write_state};
use crate::providers::CompletionProvider;
use crate::utils::text::truncate_with_ellipsis;
use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const SESSION_TITLE_CHARS: usize = 50;
const UNTITLED_SESSION: &str = "New conversation";

/// Remote store plus the identity every remote call is scoped by.
#[derive(Clone)]
pub struct RemoteBinding {
    pub store: Arc<dyn RemoteStore>,
    pub user_id: String,
}

impl RemoteBinding {
    pub fn new(store: Arc<dyn RemoteStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }
}

type RemoteHistory = (Vec<Message>, Vec<MemorySnapshot>, Vec<ConversationBranch>);

pub struct MemoryStore {
    session_id: String,
    messages: Vec<Message>,
    snapshots: Vec<MemorySnapshot>,
    branches: Vec<ConversationBranch>,
    config: MemoryConfig,
    mirror: Arc<dyn LocalMirror>,
    remote: Option<RemoteBinding>,
    provider: Arc<dyn CompletionProvider>,
}

impl MemoryStore {
    pub fn new(
        session_id: impl Into<String>,
        config: MemoryConfig,
        mirror: Arc<dyn LocalMirror>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            snapshots: Vec::new(),
            branches: Vec::new(),
            config,
            mirror,
            remote: None,
            provider,
        }
    }

    /// Enable remote persistence for an authenticated user.
    pub fn with_remote(mut self, remote: RemoteBinding) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn snapshots(&self) -> &[MemorySnapshot] {
        &self.snapshots
    }

    pub fn branches(&self) -> &[ConversationBranch] {
        &self.branches
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Append `message` unchanged, mirror it, and snapshot once enough
    /// un-summarized history has piled up.
    ///
    /// Pending placeholders are mirrored locally but reach the remote store
    /// only through [`MemoryStore::resolve_pending`].
    pub async fn save_message(&mut self, message: Message) {
        let pending = message.pending;
        self.messages.push(message.clone());
        self.mirror_state();

        if pending {
            return;
        }
        self.push_remote_message(&message).await;
        if self.should_snapshot() {
            self.create_memory_snapshot().await;
        }
    }

    /// Fill in a pending assistant placeholder. Returns `false` when `id` is
    /// unknown or already resolved.
    pub async fn resolve_pending(
        &mut self,
        id: &str,
        content: impl Into<String>,
        model: Option<&str>,
    ) -> bool {
        let Some(index) = self.messages.iter().position(|m| m.id == id && m.pending) else {
            debug!(session_id = %self.session_id, message_id = id, "no pending message to resolve");
            return false;
        };

        let message = &mut self.messages[index];
        message.content = content.into();
        message.pending = false;
        if let Some(model) = model {
            message.model = Some(model.to_string());
        }
        let resolved = message.clone();

        self.mirror_state();
        self.push_remote_message(&resolved).await;
        if self.should_snapshot() {
            self.create_memory_snapshot().await;
        }
        true
    }

    /// Summarize the conversation and record a snapshot covering every
    /// message present when this is called.
    pub async fn create_memory_snapshot(&mut self) -> MemorySnapshot {
        let message_ids: BTreeSet<String> = self.messages.iter().map(|m| m.id.clone()).collect();
        let summary = self.summarize_context().await;

        let snapshot = MemorySnapshot {
            id: Uuid::new_v4().to_string(),
            session_id: self.session_id.clone(),
            summary,
            timestamp: Utc::now(),
            message_ids,
        };
        self.snapshots.push(snapshot.clone());
        self.mirror_state();

        if let Some(remote) = self.remote.clone() {
            let result = async {
                self.ensure_remote_session(&remote).await?;
                remote
                    .store
                    .insert_snapshot(&remote.user_id, &snapshot)
                    .await
            }
            .await;
            if let Err(e) = result {
                warn!(session_id = %self.session_id, error = %e, "remote snapshot write failed");
            }
        }

        info!(
            session_id = %self.session_id,
            covered = snapshot.message_ids.len(),
            "memory snapshot created"
        );
        snapshot
    }

    /// Fork the conversation into a new session and return its id.
    ///
    /// The branch is seeded remotely with a single system message holding a
    /// summary of this conversation. Remote failures are logged; the new id is
    /// returned regardless.
    pub async fn create_branch(&mut self) -> String {
        let branch_id = Uuid::new_v4().to_string();
        let title = format!("Branch of {}", self.session_title());
        self.branches.push(ConversationBranch {
            id: branch_id.clone(),
            parent_id: self.session_id.clone(),
            created_at: Utc::now(),
            title: title.clone(),
        });
        self.mirror_state();

        let Some(remote) = self.remote.clone() else {
            debug!(session_id = %self.session_id, branch_id = %branch_id, "local-only branch");
            return branch_id;
        };

        if let Err(e) = self.seed_remote_branch(&remote, &branch_id, &title).await {
            warn!(
                session_id = %self.session_id,
                branch_id = %branch_id,
                error = %e,
                "remote branch setup failed"
            );
        }
        branch_id
    }

    /// Remove a message and prune its id from every snapshot. Returns
    /// `false` when no such message is held.
    pub async fn delete_message(&mut self, message_id: &str) -> bool {
        let Some(index) = self.messages.iter().position(|m| m.id == message_id) else {
            return false;
        };
        self.messages.remove(index);
        for snapshot in &mut self.snapshots {
            snapshot.message_ids.remove(message_id);
        }
        self.mirror_state();

        if let Some(remote) = &self.remote {
            match remote
                .store
                .delete_message(&remote.user_id, &self.session_id, message_id)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!(session_id = %self.session_id, message_id, "message was not stored remotely");
                }
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "remote delete failed");
                }
            }
        }
        true
    }

    // ── Loading ──────────────────────────────────────────────────

    /// Rebind to `session_id` and load its history: local mirror first,
    /// then the remote store. Failures yield an empty history.
    ///
    /// A mirrored state with no messages still restores its snapshots and
    /// branches unless the remote store returns a history.
    pub async fn load_session_messages(&mut self, session_id: &str) -> Vec<Message> {
        self.session_id = session_id.to_string();
        self.messages.clear();
        self.snapshots.clear();
        self.branches.clear();

        match read_state(self.mirror.as_ref(), session_id) {
            Ok(Some(state)) => {
                // Snapshots and branches outlive the messages they covered.
                self.snapshots = state.memory_snapshots;
                self.branches = state.branches;
                if !state.active_messages.is_empty() {
                    self.messages = state.active_messages;
                    debug!(session_id, count = self.messages.len(), "loaded from local mirror");
                    return self.messages.clone();
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(session_id, error = %e, "local mirror unreadable; trying remote");
            }
        }

        let Some(remote) = self.remote.clone() else {
            return Vec::new();
        };

        match fetch_remote_history(&remote, session_id).await {
            Ok(Some((messages, snapshots, branches))) => {
                self.messages = messages;
                self.snapshots = snapshots;
                self.branches = branches;
                self.mirror_state();
                debug!(session_id, count = self.messages.len(), "loaded from remote store");
                self.messages.clone()
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(session_id, error = %e, "remote load failed");
                Vec::new()
            }
        }
    }

    // ── Reads ────────────────────────────────────────────────────

    pub async fn summarize_context(&self) -> String {
        summarize(
            self.provider.as_ref(),
            &self.config.summary_model,
            &self.messages,
        )
        .await
    }

    /// Bounded slice of history for the next completion call.
    pub fn context_window(&self, include_system: bool) -> Vec<Message> {
        build_context_window(
            &self.messages,
            &self.snapshots,
            self.config.max_context_size,
            include_system,
        )
    }

    /// [`MemoryStore::context_window`] using the configured system-prompt flag.
    pub fn default_context_window(&self) -> Vec<Message> {
        self.context_window(self.config.include_system_prompts)
    }

    /// Case-insensitive substring search over message content.
    pub fn search_messages(&self, query: &str) -> Vec<Message> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.messages
            .iter()
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn serialized_state(&self) -> SerializedState {
        SerializedState {
            session_id: self.session_id.clone(),
            active_messages: self.messages.clone(),
            memory_snapshots: self.snapshots.clone(),
            branches: self.branches.clone(),
        }
    }

    // ── Internals ────────────────────────────────────────────────

    fn mirror_state(&self) {
        if let Err(e) = write_state(self.mirror.as_ref(), &self.serialized_state()) {
            warn!(
                session_id = %self.session_id,
                mirror = self.mirror.name(),
                error = %e,
                "local mirror write failed"
            );
        }
    }

    fn unsummarized_count(&self) -> usize {
        match self.snapshots.last() {
            Some(latest) => self
                .messages
                .iter()
                .filter(|m| !latest.covers(&m.id))
                .count(),
            None => self.messages.len(),
        }
    }

    fn should_snapshot(&self) -> bool {
        let threshold = self.config.summarization_threshold;
        self.config.long_term_memory_enabled
            && threshold > 0
            && self.unsummarized_count() >= threshold
    }

    fn session_title(&self) -> String {
        self.messages
            .iter()
            .find(|m| m.role == Role::User && !m.content.trim().is_empty())
            .map_or_else(
                || UNTITLED_SESSION.to_string(),
                |m| truncate_with_ellipsis(m.content.trim(), SESSION_TITLE_CHARS),
            )
    }

    async fn ensure_remote_session(&self, remote: &RemoteBinding) -> Result<()> {
        let title = self.session_title();
        remote
            .store
            .ensure_session(&remote.user_id, &self.session_id, &title, None)
            .await
    }

    async fn push_remote_message(&self, message: &Message) {
        let Some(remote) = &self.remote else {
            return;
        };
        let result = async {
            self.ensure_remote_session(remote).await?;
            remote
                .store
                .insert_message(&remote.user_id, &self.session_id, message, None)
                .await
        }
        .await;
        if let Err(e) = result {
            warn!(
                session_id = %self.session_id,
                message_id = %message.id,
                error = %e,
                "remote message write failed"
            );
        }
    }

    async fn seed_remote_branch(
        &self,
        remote: &RemoteBinding,
        branch_id: &str,
        title: &str,
    ) -> Result<()> {
        remote
            .store
            .ensure_session(&remote.user_id, branch_id, title, Some(&self.session_id))
            .await?;

        let summary = self.summarize_context().await;
        let seed = Message::system(format!(
            "This conversation continues from an earlier one. Summary of what came before: {summary}"
        ));
        let metadata = serde_json::json!({
            "kind": "branch_summary",
            "parentId": self.session_id,
        });
        remote
            .store
            .insert_message(&remote.user_id, branch_id, &seed, Some(metadata))
            .await
    }
}

async fn fetch_remote_history(
    remote: &RemoteBinding,
    session_id: &str,
) -> Result<Option<RemoteHistory>> {
    let user_id = remote.user_id.as_str();
    let messages = remote.store.list_messages(user_id, session_id).await?;
    if messages.is_empty() {
        return Ok(None);
    }
    let snapshots = remote.store.list_snapshots(user_id, session_id).await?;

    let mut branches = Vec::new();
    if let Some(session) = remote.store.get_session(user_id, session_id).await?
        && let Some(parent_id) = session.parent_id
    {
        branches.push(ConversationBranch {
            id: session.id,
            parent_id,
            created_at: session.created_at,
            title: session.title,
        });
    }
    for child in remote.store.list_child_sessions(user_id, session_id).await? {
        branches.push(ConversationBranch {
            id: child.id,
            parent_id: session_id.to_string(),
            created_at: child.created_at,
            title: child.title,
        });
    }

    Ok(Some((messages, snapshots, branches)))
}
