//! System message log

use std::collections::VecDeque;

/// Maximum number of retained lines
pub const SYSTEM_LOG_CAPACITY: usize = 500;

/// Human-readable lines from status patches and passthrough messages.
/// Oldest lines are dropped once full.
#[derive(Debug, Clone)]
pub struct SystemLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl SystemLog {
    pub fn new() -> Self {
        Self::with_capacity(SYSTEM_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for SystemLog {
    fn default() -> Self {
        Self::new()
    }
}
