//! Pending utterances

use std::collections::VecDeque;

/// Result of offering text to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePush {
    Added,
    /// Identical text is already waiting
    Duplicate,
    Full,
}

/// FIFO of utterances waiting for the speech sink, without duplicate texts
#[derive(Debug, Clone)]
pub struct SpeechQueue {
    items: VecDeque<String>,
    capacity: usize,
}

impl SpeechQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, text: &str) -> QueuePush {
        if self.contains(text) {
            return QueuePush::Duplicate;
        }
        if self.items.len() >= self.capacity {
            return QueuePush::Full;
        }
        self.items.push_back(text.to_string());
        QueuePush::Added
    }

    pub fn pop_front(&mut self) -> Option<String> {
        self.items.pop_front()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.items.iter().any(|item| item == text)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}
