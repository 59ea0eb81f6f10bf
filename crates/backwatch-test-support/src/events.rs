//! Helpers for observing the event bus in tests.

use std::time::Duration;

use backwatch_events::{Event, EventStream};
use tokio::time::{Instant, timeout_at};
use tokio_stream::StreamExt;

/// Wait for the first event matching `predicate`, giving up after `limit`.
pub async fn wait_for<F>(stream: &mut EventStream, limit: Duration, predicate: F) -> Option<Event>
where
    F: Fn(&Event) -> bool,
{
    let deadline = Instant::now() + limit;
    loop {
        match timeout_at(deadline, stream.next()).await {
            Ok(Some(Ok(envelope))) if predicate(&envelope.event) => return Some(envelope.event),
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => return None,
        }
    }
}

/// Collect every event delivered within `window`.
pub async fn collect_for(stream: &mut EventStream, window: Duration) -> Vec<Event> {
    let deadline = Instant::now() + window;
    let mut events = Vec::new();
    while let Ok(Some(item)) = timeout_at(deadline, stream.next()).await {
        if let Ok(envelope) = item {
            events.push(envelope.event);
        }
    }
    events
}
