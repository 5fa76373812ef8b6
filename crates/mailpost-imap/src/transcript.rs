//! Protocol transcript.
//!
//! A bounded, timestamped record of every line exchanged with the server.
//! Disabled unless a client opts in with
//! [`Client::enable_transcript`](crate::Client::enable_transcript).

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

/// Direction of a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to server.
    Sent,
    /// Server to client.
    Received,
}

impl Direction {
    const fn marker(self) -> &'static str {
        match self {
            Self::Sent => "C:",
            Self::Received => "S:",
        }
    }
}

/// A single recorded line.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    /// When the line was sent or received.
    pub at: DateTime<Utc>,
    /// Which side produced the line.
    pub direction: Direction,
    /// Line text without the CRLF. Literal payloads are left out; their
    /// `{N}` marker stays on the line.
    pub line: String,
}

/// Ring buffer of protocol lines.
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: VecDeque<TranscriptEntry>,
    capacity: usize,
}

impl Transcript {
    /// Creates a transcript keeping at most `capacity` lines.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Records a line, evicting the oldest one when full.
    pub fn record(&mut self, direction: Direction, line: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(TranscriptEntry {
            at: Utc::now(),
            direction,
            line: line.into(),
        });
    }

    /// Returns the recorded lines, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter()
    }

    /// Number of recorded lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut last: Option<DateTime<Utc>> = None;
        for entry in &self.entries {
            let stamp = entry.at.format("%Y-%m-%d %H:%M:%S");
            let marker = entry.direction.marker();
            if let Some(last) = last {
                let delta = entry.at.signed_duration_since(last).num_milliseconds();
                writeln!(f, "{stamp} ({delta:+5}ms) {marker} {}", entry.line)?;
            } else {
                writeln!(f, "{stamp} {marker} {}", entry.line)?;
            }
            last = Some(entry.at);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let mut transcript = Transcript::new(10);
        transcript.record(Direction::Received, "* OK ready");
        transcript.record(Direction::Sent, "A0001 LOGIN <redacted>");

        let lines: Vec<_> = transcript.entries().map(|e| e.line.as_str()).collect();
        assert_eq!(lines, vec!["* OK ready", "A0001 LOGIN <redacted>"]);
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut transcript = Transcript::new(2);
        transcript.record(Direction::Sent, "one");
        transcript.record(Direction::Sent, "two");
        transcript.record(Direction::Sent, "three");

        let lines: Vec<_> = transcript.entries().map(|e| e.line.clone()).collect();
        assert_eq!(lines, vec!["two", "three"]);
    }

    #[test]
    fn test_display_marks_direction() {
        let mut transcript = Transcript::new(4);
        transcript.record(Direction::Received, "* OK ready");
        transcript.record(Direction::Sent, "A0001 LOGOUT");

        let rendered = transcript.to_string();
        assert!(rendered.contains("S: * OK ready"));
        assert!(rendered.contains("C: A0001 LOGOUT"));
        assert_eq!(rendered.lines().count(), 2);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut transcript = Transcript::new(0);
        transcript.record(Direction::Sent, "a");
        transcript.record(Direction::Sent, "b");
        assert_eq!(transcript.len(), 1);
    }
}
