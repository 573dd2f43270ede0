//! Bounded per-room message history.

use std::collections::VecDeque;

use super::message::Message;

/// FIFO log of the most recent messages of a room.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    entries: VecDeque<Message>,
    capacity: usize,
}

impl HistoryRing {
    /// Create an empty ring holding at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, evicting the oldest ones beyond capacity.
    pub fn push(&mut self, message: Message) {
        self.entries.push_back(message);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// The most recent `count` messages, oldest first.
    pub fn recent(&self, count: usize) -> Vec<Message> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retention cap.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
