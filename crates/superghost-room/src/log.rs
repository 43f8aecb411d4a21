//! Append-only room history with a delivery cursor.

use superghost_protocol::LogEvent;

/// Every event a room has produced, plus a cursor marking how much of it
/// has already been delivered.
///
/// The room calls [`flush`](Self::flush) once per externally visible
/// action, right before pushing that action's events, so
/// [`pending`](Self::pending) is exactly the batch the action produced.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<LogEvent>,
    cursor: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks everything so far as delivered.
    pub fn flush(&mut self) {
        self.cursor = self.events.len();
    }

    pub fn push(&mut self, event: LogEvent) {
        self.events.push(event);
    }

    /// Events from position `cursor` on. Empty if `cursor` is past the end.
    pub fn since(&self, cursor: usize) -> &[LogEvent] {
        self.events.get(cursor..).unwrap_or_default()
    }

    /// Events pushed since the last flush.
    pub fn pending(&self) -> &[LogEvent] {
        self.since(self.cursor)
    }

    pub fn full(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
