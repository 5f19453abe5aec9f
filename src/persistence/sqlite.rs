use super::remote::{RemoteSession, RemoteStore};
use crate::error::PersistenceError;
use crate::memory::{MemorySnapshot, Message, Role};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::str::FromStr;

/// SQLite-backed remote store using an sqlx async pool.
pub struct SqliteRemoteStore {
    pool: SqlitePool,
}

const SCHEMA_META_TABLE: &str = "
CREATE TABLE IF NOT EXISTS convokit_schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";
const SCHEMA_VERSION_KEY: &str = "remote_schema_version";
const SCHEMA_VERSION: u32 = 1;

async fn ensure_schema_version(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_META_TABLE)
        .execute(pool)
        .await
        .context("create convokit_schema_meta table")?;

    let stored_version: Option<(String,)> =
        sqlx::query_as("SELECT value FROM convokit_schema_meta WHERE key = $1")
            .bind(SCHEMA_VERSION_KEY)
            .fetch_optional(pool)
            .await
            .context("load remote schema version")?;

    if let Some((value,)) = stored_version {
        let parsed = value
            .parse::<u32>()
            .with_context(|| format!("invalid remote schema version value: {value}"))?;
        anyhow::ensure!(
            parsed == SCHEMA_VERSION,
            "incompatible remote schema version: stored={parsed}, expected={SCHEMA_VERSION}"
        );
        return Ok(());
    }

    sqlx::query("INSERT INTO convokit_schema_meta (key, value) VALUES ($1, $2)")
        .bind(SCHEMA_VERSION_KEY)
        .bind(SCHEMA_VERSION.to_string())
        .execute(pool)
        .await
        .context("persist remote schema version")?;

    Ok(())
}

impl SqliteRemoteStore {
    /// Create a new store with an existing pool and run migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        ensure_schema_version(&pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_sessions (
                 id TEXT PRIMARY KEY,
                 user_id TEXT NOT NULL,
                 title TEXT NOT NULL,
                 parent_id TEXT,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_messages (
                 id TEXT PRIMARY KEY,
                 session_id TEXT NOT NULL REFERENCES chat_sessions(id) ON DELETE CASCADE,
                 role TEXT NOT NULL,
                 content TEXT NOT NULL,
                 model TEXT,
                 image_url TEXT,
                 metadata TEXT,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS memory_snapshots (
                 id TEXT PRIMARY KEY,
                 session_id TEXT NOT NULL REFERENCES chat_sessions(id) ON DELETE CASCADE,
                 summary TEXT NOT NULL,
                 message_ids TEXT NOT NULL,
                 timestamp TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_session
                 ON chat_messages(session_id, created_at)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_sessions_parent
                 ON chat_sessions(user_id, parent_id)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Open (creating if needed) a database file.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create remote store directory: {}", parent.display())
            })?;
        }

        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .with_context(|| format!("Failed to open remote store: {}", db_path.display()))?;

        Self::new(pool).await
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Fixed-width UTC timestamps so lexical order matches chronological order.
fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .with_context(|| format!("invalid stored timestamp: {value}"))
}

fn map_session_row(row: &SqliteRow) -> Result<RemoteSession> {
    let created_at: String = row.try_get("created_at")?;
    Ok(RemoteSession {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        parent_id: row.try_get("parent_id")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn map_message_row(row: &SqliteRow) -> Result<Message> {
    let role_raw: String = row.try_get("role")?;
    let role = Role::from_str(&role_raw).map_err(|_| PersistenceError::UnknownRole(role_raw))?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Message {
        id: row.try_get("id")?,
        role,
        content: row.try_get("content")?,
        timestamp: parse_timestamp(&created_at)?,
        pending: false,
        image_url: row.try_get("image_url")?,
        model: row.try_get("model")?,
    })
}

fn map_snapshot_row(row: &SqliteRow) -> Result<MemorySnapshot> {
    let ids_raw: String = row.try_get("message_ids")?;
    let message_ids: BTreeSet<String> =
        serde_json::from_str(&ids_raw).context("deserialize snapshot message_ids")?;
    let timestamp: String = row.try_get("timestamp")?;

    Ok(MemorySnapshot {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        summary: row.try_get("summary")?,
        timestamp: parse_timestamp(&timestamp)?,
        message_ids,
    })
}

fn sqlx_error(err: sqlx::Error) -> PersistenceError {
    PersistenceError::Sqlx(err.to_string())
}

impl RemoteStore for SqliteRemoteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn ensure_session<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
        title: &'a str,
        parent_id: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let timestamp = format_timestamp(Utc::now());
            sqlx::query(
                "INSERT INTO chat_sessions (id, user_id, title, parent_id, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $5)
                 ON CONFLICT(id) DO NOTHING",
            )
            .bind(session_id)
            .bind(user_id)
            .bind(title)
            .bind(parent_id)
            .bind(&timestamp)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error)?;
            Ok(())
        })
    }

    fn get_session<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<RemoteSession>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, user_id, title, parent_id, created_at
                 FROM chat_sessions
                 WHERE id = $1 AND user_id = $2",
            )
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("query session by id")?;

            row.map(|r| map_session_row(&r)).transpose()
        })
    }

    fn list_child_sessions<'a>(
        &'a self,
        user_id: &'a str,
        parent_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteSession>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT id, user_id, title, parent_id, created_at
                 FROM chat_sessions
                 WHERE user_id = $1 AND parent_id = $2
                 ORDER BY created_at ASC, rowid ASC",
            )
            .bind(user_id)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .context("query child sessions")?;

            rows.iter().map(map_session_row).collect()
        })
    }

    fn list_messages<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Message>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT m.id, m.role, m.content, m.model, m.image_url, m.created_at
                 FROM chat_messages m
                 JOIN chat_sessions s ON s.id = m.session_id
                 WHERE m.session_id = $1 AND s.user_id = $2
                 ORDER BY m.created_at ASC, m.rowid ASC",
            )
            .bind(session_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("query session messages")?;

            rows.iter().map(map_message_row).collect()
        })
    }

    fn insert_message<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
        message: &'a Message,
        metadata: Option<serde_json::Value>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let metadata_str = metadata
                .map(|value| serde_json::to_string(&value))
                .transpose()
                .context("serialize message metadata")?;
            let created_at = format_timestamp(message.timestamp);

            let result = sqlx::query(
                "INSERT INTO chat_messages
                     (id, session_id, role, content, model, image_url, metadata, created_at)
                 SELECT $1, $2, $3, $4, $5, $6, $7, $8
                 WHERE EXISTS (SELECT 1 FROM chat_sessions WHERE id = $2 AND user_id = $9)",
            )
            .bind(&message.id)
            .bind(session_id)
            .bind(message.role.as_ref())
            .bind(&message.content)
            .bind(message.model.as_deref())
            .bind(message.image_url.as_deref())
            .bind(metadata_str)
            .bind(&created_at)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error)?;

            anyhow::ensure!(
                result.rows_affected() == 1,
                "session {session_id} not found for user"
            );

            sqlx::query("UPDATE chat_sessions SET updated_at = $1 WHERE id = $2")
                .bind(&created_at)
                .bind(session_id)
                .execute(&self.pool)
                .await
                .map_err(sqlx_error)?;
            Ok(())
        })
    }

    fn delete_message<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
        message_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let result = sqlx::query(
                "DELETE FROM chat_messages
                 WHERE id = $1
                   AND session_id = $2
                   AND EXISTS (SELECT 1 FROM chat_sessions WHERE id = $2 AND user_id = $3)",
            )
            .bind(message_id)
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error)?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn insert_snapshot<'a>(
        &'a self,
        user_id: &'a str,
        snapshot: &'a MemorySnapshot,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let message_ids =
                serde_json::to_string(&snapshot.message_ids).context("serialize message_ids")?;

            let result = sqlx::query(
                "INSERT INTO memory_snapshots (id, session_id, summary, message_ids, timestamp)
                 SELECT $1, $2, $3, $4, $5
                 WHERE EXISTS (SELECT 1 FROM chat_sessions WHERE id = $2 AND user_id = $6)",
            )
            .bind(&snapshot.id)
            .bind(&snapshot.session_id)
            .bind(&snapshot.summary)
            .bind(&message_ids)
            .bind(format_timestamp(snapshot.timestamp))
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error)?;

            anyhow::ensure!(
                result.rows_affected() == 1,
                "session {} not found for user",
                snapshot.session_id
            );
            Ok(())
        })
    }

    fn list_snapshots<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<MemorySnapshot>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT p.id, p.session_id, p.summary, p.message_ids, p.timestamp
                 FROM memory_snapshots p
                 JOIN chat_sessions s ON s.id = p.session_id
                 WHERE p.session_id = $1 AND s.user_id = $2
                 ORDER BY p.timestamp ASC, p.rowid ASC",
            )
            .bind(session_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("query session snapshots")?;

            rows.iter().map(map_snapshot_row).collect()
        })
    }
}
