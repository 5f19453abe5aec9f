use std::collections::BTreeSet;

use convokit::config::MemoryConfig;
use convokit::memory::Message;

use super::memory_harness::{
    ScriptedProvider, local_store, manual_snapshots, save_all, turns, with_failing_remote,
};

#[tokio::test]
async fn snapshot_covers_exactly_the_ids_present_at_call_time() {
    let mut store = local_store(manual_snapshots(20), ScriptedProvider::new("sum"));
    save_all(&mut store, turns(5)).await;
    let before: BTreeSet<String> = store.messages().iter().map(|m| m.id.clone()).collect();

    let snapshot = store.create_memory_snapshot().await;
    store.save_message(Message::user("after")).await;

    assert_eq!(snapshot.message_ids, before);
    assert_eq!(store.snapshots()[0].message_ids, before);
    assert!(!store.snapshots()[0].covers(&store.messages()[5].id));
}

#[tokio::test]
async fn automatic_snapshots_follow_the_threshold() {
    let config = MemoryConfig {
        summarization_threshold: 4,
        ..MemoryConfig::default()
    };
    let provider = ScriptedProvider::new("rolling summary");
    let mut store = local_store(config, provider.clone());

    save_all(&mut store, turns(3)).await;
    assert!(store.snapshots().is_empty());

    store.save_message(Message::user("fourth")).await;
    assert_eq!(store.snapshots().len(), 1);

    save_all(&mut store, turns(3)).await;
    assert_eq!(store.snapshots().len(), 1);
    store.save_message(Message::user("eighth")).await;
    assert_eq!(store.snapshots().len(), 2);
    assert_eq!(store.snapshots()[1].message_ids.len(), 8);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn summary_falls_back_when_provider_fails() {
    let provider = ScriptedProvider::new("unused");
    provider.push_failure("503 upstream");
    let mut store = local_store(manual_snapshots(20), provider.clone());
    save_all(&mut store, turns(4)).await;

    let snapshot = store.create_memory_snapshot().await;

    assert_eq!(snapshot.summary, "Conversation with 2 user messages");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn two_message_summary_skips_the_provider() {
    let provider = ScriptedProvider::new("unused");
    let mut store = local_store(manual_snapshots(20), provider.clone());
    save_all(&mut store, turns(2)).await;

    assert_eq!(
        store.summarize_context().await,
        "Conversation with 1 user messages"
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn delete_prunes_every_snapshot_and_keeps_them() {
    let mut store = local_store(manual_snapshots(20), ScriptedProvider::new("sum"));
    save_all(&mut store, turns(3)).await;
    store.create_memory_snapshot().await;
    save_all(&mut store, turns(2)).await;
    store.create_memory_snapshot().await;
    let victim = store.messages()[0].id.clone();

    assert!(store.delete_message(&victim).await);

    assert_eq!(store.snapshots().len(), 2);
    assert!(store.snapshots().iter().all(|s| !s.covers(&victim)));
    assert_eq!(store.snapshots()[0].message_ids.len(), 2);
    assert_eq!(store.snapshots()[1].message_ids.len(), 4);
    assert!(store.messages().iter().all(|m| m.id != victim));
}

#[tokio::test]
async fn remote_failures_do_not_disturb_local_state() {
    let store = local_store(manual_snapshots(20), ScriptedProvider::new("sum"));
    let (mut store, remote) = with_failing_remote(store);

    save_all(&mut store, turns(3)).await;
    store.create_memory_snapshot().await;
    let first = store.messages()[0].id.clone();
    assert!(store.delete_message(&first).await);

    assert_eq!(store.messages().len(), 2);
    assert_eq!(store.snapshots().len(), 1);
    assert!(remote.calls() > 0);
}
