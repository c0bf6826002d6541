// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session append-only event buffer supporting resumable replay.
//!
//! Each stream assigns strictly increasing sequence numbers starting at 1;
//! event ids are literally `"{stream_id}:{seq}"`. Every `store` and every
//! `replay_after` prunes events older than the TTL and trims the head down
//! to the per-stream cap, rebuilding the position index after any drop. An
//! out-of-range or unknown `last_event_id` yields an empty replay rather
//! than an error; the caller simply begins anew.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default retention window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Default per-stream cap.
pub const DEFAULT_MAX_EVENTS: usize = 5000;

/// One buffered protocol event.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub event_id: String,
    pub ts: Instant,
    pub payload: serde_json::Value,
}

#[derive(Debug, Default)]
struct StreamState {
    next_seq: u64,
    events: Vec<EventRecord>,
    /// event_id -> position in `events`; rebuilt after pruning.
    index: HashMap<String, usize>,
}

impl StreamState {
    fn prune(&mut self, ttl: Duration, cap: usize) {
        let now = Instant::now();
        let before = self.events.len();

        // Drop the expired head, then trim further until the cap holds.
        let keep_from = self
            .events
            .iter()
            .position(|event| now.duration_since(event.ts) < ttl)
            .unwrap_or(before);
        let remaining = before - keep_from;
        let cut = keep_from + remaining.saturating_sub(cap);
        if cut > 0 {
            self.events.drain(..cut);
        }

        if self.events.len() != before {
            self.index = self
                .events
                .iter()
                .enumerate()
                .map(|(pos, event)| (event.event_id.clone(), pos))
                .collect();
        }
    }
}

/// Append-only in-memory buffer of protocol events with TTL and cap.
pub struct EventLog {
    ttl: Duration,
    max_events_per_stream: usize,
    streams: Mutex<HashMap<String, StreamState>>,
}

impl EventLog {
    pub fn new(ttl: Duration, max_events_per_stream: usize) -> Self {
        Self {
            ttl,
            max_events_per_stream,
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Buffer `payload` on `stream_id` and return the assigned event id.
    ///
    /// Storage never fails; pruning is best-effort.
    pub fn store(&self, stream_id: &str, payload: serde_json::Value) -> String {
        let mut streams = self.streams.lock().expect("event log lock poisoned");
        let stream = streams.entry(stream_id.to_string()).or_default();

        stream.next_seq += 1;
        let event_id = format!("{stream_id}:{}", stream.next_seq);
        stream.index.insert(event_id.clone(), stream.events.len());
        stream.events.push(EventRecord {
            event_id: event_id.clone(),
            ts: Instant::now(),
            payload,
        });
        stream.prune(self.ttl, self.max_events_per_stream);
        event_id
    }

    /// Events strictly after `last_event_id`, in order, with their stream id.
    ///
    /// Returns `None` when no replay is possible: empty anchor, unknown
    /// stream, or an anchor that has been pruned out of the window.
    pub fn replay_after(&self, last_event_id: &str) -> Option<(String, Vec<EventRecord>)> {
        if last_event_id.is_empty() {
            return None;
        }
        let (stream_id, _) = parse_event_id(last_event_id)?;

        let mut streams = self.streams.lock().expect("event log lock poisoned");
        let stream = streams.get_mut(stream_id)?;
        stream.prune(self.ttl, self.max_events_per_stream);

        let anchor = *stream.index.get(last_event_id)?;
        let events = stream.events[anchor + 1..].to_vec();
        Some((stream_id.to_string(), events))
    }

    /// The latest assigned sequence number for `stream_id`.
    pub fn last_seq(&self, stream_id: &str) -> u64 {
        self.streams
            .lock()
            .expect("event log lock poisoned")
            .get(stream_id)
            .map(|stream| stream.next_seq)
            .unwrap_or(0)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_EVENTS)
    }
}

/// Split an event id into stream id and sequence at the first `:`.
pub fn parse_event_id(event_id: &str) -> Option<(&str, u64)> {
    let (stream_id, seq) = event_id.split_once(':')?;
    let seq = seq.parse().ok()?;
    Some((stream_id, seq))
}
