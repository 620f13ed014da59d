//! Events command implementation

use crate::error::Result;
use crate::events::Event;
use crate::store::ChunkStore;

/// Most recent interaction log entries, newest first
pub async fn cmd_events(store: &ChunkStore, limit: usize) -> Result<Vec<Event>> {
    store.events().recent(limit).await
}

/// Print events to console
pub fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("No events recorded.");
        return;
    }

    for event in events {
        println!("#{} {} {}", event.id, event.created_at, event.event_type);
        let Some(payload) = event.payload_json() else {
            continue;
        };
        for key in ["source", "question", "chunk_count", "degraded", "error"] {
            if let Some(value) = payload.get(key).filter(|v| !v.is_null()) {
                println!("   {}: {}", key, value);
            }
        }
    }
}
