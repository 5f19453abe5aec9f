use crate::error::PersistenceError;
use crate::memory::SerializedState;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Synchronous key-value mirror of session state.
pub trait LocalMirror: Send + Sync {
    fn name(&self) -> &str;

    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;
}

pub fn mirror_key(session_id: &str) -> String {
    format!("chat-memory-{session_id}")
}

/// Decode the mirrored state for `session_id`, if any.
pub fn read_state(mirror: &dyn LocalMirror, session_id: &str) -> Result<Option<SerializedState>> {
    let key = mirror_key(session_id);
    let Some(raw) = mirror.read(&key)? else {
        return Ok(None);
    };
    let state = serde_json::from_str::<SerializedState>(&raw).map_err(|e| {
        PersistenceError::CorruptState {
            key: key.clone(),
            message: e.to_string(),
        }
    })?;
    if state.session_id != session_id {
        tracing::warn!(
            key = %key,
            stored = %state.session_id,
            requested = session_id,
            "mirrored state belongs to another session; ignoring"
        );
        return Ok(None);
    }
    Ok(Some(state))
}

pub fn write_state(mirror: &dyn LocalMirror, state: &SerializedState) -> Result<()> {
    let encoded = serde_json::to_string(state).context("serialize session state")?;
    mirror.write(&mirror_key(&state.session_id), &encoded)
}

// ── File-backed mirror ───────────────────────────────────────────

/// One JSON file per key under a data directory.
pub struct FileMirror {
    dir: PathBuf,
}

impl FileMirror {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// File for `key`. Bytes outside `[A-Za-z0-9_-]` are percent-encoded,
    /// so distinct keys never share a file.
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_file_stem(key)))
    }
}

impl LocalMirror for FileMirror {
    fn name(&self) -> &str {
        "file"
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Io(e))
                .with_context(|| format!("read mirror file {}", path.display())),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create mirror directory {}", self.dir.display()))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replace {}", path.display()))?;
        Ok(())
    }
}

fn encode_file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

// ── In-process mirror ────────────────────────────────────────────

/// Map-backed mirror for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryMirror {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalMirror for InMemoryMirror {
    fn name(&self) -> &str {
        "memory"
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
