use std::sync::Arc;

use convokit::memory::{MemoryStore, Message, RemoteBinding};
use convokit::persistence::{FileMirror, InMemoryMirror, LocalMirror, mirror_key};
use tempfile::TempDir;

use super::memory_harness::{
    ScriptedProvider, USER, contents, local_store, manual_snapshots, save_all, sqlite_remote,
    turns, with_failing_remote,
};

#[tokio::test]
async fn unknown_session_with_unreachable_remote_loads_empty() {
    let store = local_store(manual_snapshots(20), ScriptedProvider::new("unused"));
    let (mut store, remote) = with_failing_remote(store);

    let loaded = store.load_session_messages("abc").await;

    assert!(loaded.is_empty());
    assert_eq!(store.session_id(), "abc");
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn file_mirror_survives_a_restart() {
    let tmp = TempDir::new().unwrap();
    let provider = ScriptedProvider::new("sum");
    {
        let mirror = Arc::new(FileMirror::new(tmp.path()));
        let mut store = MemoryStore::new("trip", manual_snapshots(20), mirror, provider.clone());
        save_all(&mut store, turns(4)).await;
        store.create_memory_snapshot().await;
        store.create_branch().await;
    }

    let mirror = Arc::new(FileMirror::new(tmp.path()));
    let mut store = MemoryStore::new("other", manual_snapshots(20), mirror, provider);
    let loaded = store.load_session_messages("trip").await;

    assert_eq!(contents(&loaded), vec!["turn 0", "turn 1", "turn 2", "turn 3"]);
    assert_eq!(store.snapshots().len(), 1);
    assert_eq!(store.branches().len(), 1);
}

#[tokio::test]
async fn corrupt_mirror_falls_back_to_remote() {
    let remote = sqlite_remote().await;
    let provider = ScriptedProvider::new("sum");
    {
        let mut writer = MemoryStore::new(
            "notes",
            manual_snapshots(20),
            Arc::new(InMemoryMirror::new()),
            provider.clone(),
        )
        .with_remote(RemoteBinding::new(remote.clone(), USER));
        writer.save_message(Message::user("remember the milk")).await;
    }

    let mirror = Arc::new(InMemoryMirror::new());
    mirror.write(&mirror_key("notes"), "{ definitely not json").unwrap();
    let mut reader = MemoryStore::new("x", manual_snapshots(20), mirror.clone(), provider)
        .with_remote(RemoteBinding::new(remote, USER));

    let loaded = reader.load_session_messages("notes").await;

    assert_eq!(contents(&loaded), vec!["remember the milk"]);
    let repaired = mirror.read(&mirror_key("notes")).unwrap().unwrap();
    assert!(repaired.contains("remember the milk"));
}

#[tokio::test]
async fn remote_history_is_private_to_its_user() {
    let remote = sqlite_remote().await;
    let provider = ScriptedProvider::new("sum");
    {
        let mut writer = MemoryStore::new(
            "diary",
            manual_snapshots(20),
            Arc::new(InMemoryMirror::new()),
            provider.clone(),
        )
        .with_remote(RemoteBinding::new(remote.clone(), USER));
        writer.save_message(Message::user("secret")).await;
    }

    let mut intruder = MemoryStore::new(
        "x",
        manual_snapshots(20),
        Arc::new(InMemoryMirror::new()),
        provider,
    )
    .with_remote(RemoteBinding::new(remote, "someone-else"));

    assert!(intruder.load_session_messages("diary").await.is_empty());
}

#[tokio::test]
async fn search_is_case_insensitive_and_chronological() {
    let mut store = local_store(manual_snapshots(20), ScriptedProvider::new("unused"));
    for text in ["Tokio runtime", "serde derive", "why is TOKIO fast", "done"] {
        store.save_message(Message::user(text)).await;
    }

    assert!(store.search_messages("").is_empty());
    assert!(store.search_messages("   ").is_empty());
    assert_eq!(
        contents(&store.search_messages("tokio")),
        vec!["Tokio runtime", "why is TOKIO fast"]
    );
    assert!(store.search_messages("python").is_empty());
}

#[tokio::test]
async fn deleted_messages_stay_deleted_after_reload() {
    let tmp = TempDir::new().unwrap();
    let provider = ScriptedProvider::new("sum");
    let mirror = Arc::new(FileMirror::new(tmp.path()));
    let mut store = MemoryStore::new("s", manual_snapshots(20), mirror.clone(), provider.clone());
    save_all(&mut store, turns(3)).await;
    let victim = store.messages()[1].id.clone();
    store.delete_message(&victim).await;

    let mut reloaded = MemoryStore::new("s", manual_snapshots(20), mirror, provider);
    let loaded = reloaded.load_session_messages("s").await;

    assert_eq!(contents(&loaded), vec!["turn 0", "turn 2"]);
}

#[tokio::test]
async fn look_alike_session_ids_do_not_share_history() {
    let tmp = TempDir::new().unwrap();
    let provider = ScriptedProvider::new("sum");
    {
        let mirror = Arc::new(FileMirror::new(tmp.path()));
        let mut store =
            MemoryStore::new("work.notes", manual_snapshots(20), mirror, provider.clone());
        save_all(&mut store, vec![Message::user("dotted")]).await;
    }

    let mirror = Arc::new(FileMirror::new(tmp.path()));
    let mut store = MemoryStore::new("fresh", manual_snapshots(20), mirror, provider.clone());
    assert!(store.load_session_messages("work_notes").await.is_empty());
    save_all(&mut store, vec![Message::user("underscored")]).await;

    let mirror = Arc::new(FileMirror::new(tmp.path()));
    let mut store = MemoryStore::new("fresh", manual_snapshots(20), mirror, provider);
    let dotted = store.load_session_messages("work.notes").await;
    assert_eq!(contents(&dotted), vec!["dotted"]);
    let underscored = store.load_session_messages("work_notes").await;
    assert_eq!(contents(&underscored), vec!["underscored"]);
}
