use convokit::memory::{MemoryStore, Message, RemoteBinding, Role};
use convokit::persistence::{InMemoryMirror, RemoteStore};
use std::sync::Arc;

use super::memory_harness::{
    SESSION, ScriptedProvider, USER, local_store, manual_snapshots, save_all, sqlite_remote,
    turns, with_failing_remote,
};

#[tokio::test]
async fn local_only_branch_makes_no_provider_call() {
    let provider = ScriptedProvider::new("unused");
    let mut store = local_store(manual_snapshots(20), provider.clone());
    save_all(&mut store, turns(6)).await;

    let branch_id = store.create_branch().await;

    assert!(!branch_id.is_empty());
    assert_eq!(store.branches().len(), 1);
    assert_eq!(store.branches()[0].parent_id, SESSION);
    assert_eq!(provider.calls(), 0);
    assert_eq!(store.messages().len(), 6);
}

#[tokio::test]
async fn branch_id_is_returned_when_every_remote_call_fails() {
    let store = local_store(manual_snapshots(20), ScriptedProvider::new("sum"));
    let (mut store, remote) = with_failing_remote(store);
    save_all(&mut store, turns(4)).await;

    let first = store.create_branch().await;
    let second = store.create_branch().await;

    assert!(!first.is_empty());
    assert_ne!(first, second);
    assert_eq!(store.branches().len(), 2);
    assert!(remote.calls() > 0);
}

#[tokio::test]
async fn remote_branch_is_seeded_with_one_summary_message_only() {
    let remote = sqlite_remote().await;
    let provider = ScriptedProvider::new("Discussed sourdough starters.");
    let mut store = MemoryStore::new(
        "bread",
        manual_snapshots(20),
        Arc::new(InMemoryMirror::new()),
        provider,
    )
    .with_remote(RemoteBinding::new(remote.clone(), USER));
    save_all(&mut store, turns(5)).await;

    let branch_id = store.create_branch().await;

    let parent = remote.list_messages(USER, "bread").await.unwrap();
    assert_eq!(parent.len(), 5);

    let seeded = remote.list_messages(USER, &branch_id).await.unwrap();
    assert_eq!(seeded.len(), 1);
    assert_eq!(seeded[0].role, Role::System);
    assert!(seeded[0].content.contains("Discussed sourdough starters."));

    let children = remote.list_child_sessions(USER, "bread").await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, branch_id);
}

#[tokio::test]
async fn opening_a_branch_shows_the_seed_and_its_parent() {
    let remote = sqlite_remote().await;
    let provider = ScriptedProvider::new("Parent summary.");
    let mut parent = MemoryStore::new(
        "parent",
        manual_snapshots(20),
        Arc::new(InMemoryMirror::new()),
        provider.clone(),
    )
    .with_remote(RemoteBinding::new(remote.clone(), USER));
    save_all(&mut parent, turns(3)).await;
    let branch_id = parent.create_branch().await;

    let mut child = MemoryStore::new(
        "somewhere-else",
        manual_snapshots(20),
        Arc::new(InMemoryMirror::new()),
        provider,
    )
    .with_remote(RemoteBinding::new(remote, USER));
    let loaded = child.load_session_messages(&branch_id).await;

    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].is_system());
    assert_eq!(child.branches().len(), 1);
    assert_eq!(child.branches()[0].id, branch_id);
    assert_eq!(child.branches()[0].parent_id, "parent");

    child.save_message(Message::user("continue here")).await;
    assert_eq!(child.messages().len(), 2);
}
