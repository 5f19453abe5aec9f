//! Context-window selection.
//!
//! Picks the bounded slice of a session handed to the completion provider.
//! When the history overflows and a snapshot exists, the covered prefix is
//! replaced by one synthesized summary message.

use super::types::{MemorySnapshot, Message};

pub const SUMMARY_PREFIX: &str = "Previous conversation summary: ";

/// Select at most `max_size` messages for the next completion call.
///
/// Pure: reads `messages` and `snapshots`, never mutates them. System
/// messages are kept ahead of conversation turns; on overflow the oldest
/// turns are dropped first.
pub fn build_context_window(
    messages: &[Message],
    snapshots: &[MemorySnapshot],
    max_size: usize,
    include_system: bool,
) -> Vec<Message> {
    let filtered: Vec<&Message> = messages
        .iter()
        .filter(|m| include_system || !m.is_system())
        .collect();

    if filtered.len() <= max_size {
        return filtered.into_iter().cloned().collect();
    }

    let (system, turns): (Vec<&Message>, Vec<&Message>) =
        filtered.into_iter().partition(|m| m.is_system());

    let Some(latest) = snapshots.last() else {
        let system = newest(&system, max_size);
        let budget = max_size - system.len();
        let mut window: Vec<Message> = system.into_iter().cloned().collect();
        window.extend(newest(&turns, budget).into_iter().cloned());
        return window;
    };

    if max_size == 0 {
        return Vec::new();
    }

    let uncovered: Vec<&Message> = turns
        .into_iter()
        .filter(|m| !latest.covers(&m.id))
        .collect();
    let system = newest(&system, max_size - 1);
    let budget = max_size - system.len() - 1;

    let mut window: Vec<Message> = system.into_iter().cloned().collect();
    window.push(summary_message(latest));
    window.extend(newest(&uncovered, budget).into_iter().cloned());
    window
}

/// System message standing in for everything a snapshot covers.
pub fn summary_message(snapshot: &MemorySnapshot) -> Message {
    Message {
        id: format!("summary-{}", snapshot.id),
        timestamp: snapshot.timestamp,
        ..Message::system(format!("{SUMMARY_PREFIX}{}", snapshot.summary))
    }
}

fn newest<'a>(items: &[&'a Message], limit: usize) -> Vec<&'a Message> {
    let start = items.len().saturating_sub(limit);
    items[start..].to_vec()
}
