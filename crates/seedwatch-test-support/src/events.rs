//! Event-stream assertions.

use std::time::Duration;

use anyhow::{Result, anyhow};
use seedwatch_events::{Event, EventStream};
use tokio::time::{Instant, timeout};

/// Consume events until one satisfies `predicate`, failing after `limit`.
///
/// # Errors
///
/// Returns an error when the deadline passes or the bus closes first.
pub async fn next_matching<P>(stream: &mut EventStream, limit: Duration, predicate: P) -> Result<Event>
where
    P: Fn(&Event) -> bool,
{
    let deadline = Instant::now() + limit;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let envelope = timeout(remaining, stream.next())
            .await
            .map_err(|_| anyhow!("timed out waiting for matching event"))?
            .ok_or_else(|| anyhow!("event stream closed"))?;
        if predicate(&envelope.event) {
            return Ok(envelope.event);
        }
    }
}
