//! Stability inference for scales that do not flag it on the wire.

use std::collections::VecDeque;

use crate::reading::ScaleStatus;

/// Ring buffer of the last `capacity` raw lines. The reading is stable only
/// when the buffer is full and every entry is identical.
#[derive(Debug, Clone)]
pub struct StabilityWindow {
    lines: VecDeque<String>,
    capacity: usize,
}

impl StabilityWindow {
    /// A zero capacity is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn push(&mut self, line: &str) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_owned());
    }

    pub fn classify(&self) -> ScaleStatus {
        let full = self.lines.len() == self.capacity;
        let uniform = self
            .lines
            .front()
            .is_some_and(|first| self.lines.iter().all(|l| l == first));
        if full && uniform {
            ScaleStatus::Stable
        } else {
            ScaleStatus::Unstable
        }
    }

    /// Push `line` and classify the updated window.
    pub fn observe(&mut self, line: &str) -> ScaleStatus {
        self.push(line);
        self.classify()
    }
}
