//! Command history store
//!
//! History is a capped, deduplicated, most-recent-first list of command
//! strings. Pushing a command that is already present moves it to the front.
//! Recency is insertion order, not execution time.

use std::path::{Path, PathBuf};

use crate::error::HistoryError;

/// Default number of remembered commands
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Capped ordered-set interface over command history
pub trait CommandHistory: Send {
    /// Record a command as the most recent entry
    fn push(&mut self, command: &str) -> Result<(), HistoryError>;

    /// All entries, most recent first
    fn to_list(&self) -> Vec<String>;

    /// Forget every entry
    fn clear(&mut self) -> Result<(), HistoryError>;

    /// Entries containing `needle`, case-insensitively, most recent first
    fn filter(&self, needle: &str) -> Vec<String> {
        let needle = needle.to_lowercase();
        self.to_list()
            .into_iter()
            .filter(|cmd| cmd.to_lowercase().contains(&needle))
            .collect()
    }
}

/// In-memory history
#[derive(Debug, Clone)]
pub struct CappedHistory {
    entries: Vec<String>,
    capacity: usize,
}

impl CappedHistory {
    /// Create an empty history with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Build from a stored most-recent-first list, dropping duplicates and
    /// anything past capacity
    pub fn from_entries(entries: Vec<String>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        for entry in entries {
            if !entry.trim().is_empty() && !history.entries.contains(&entry) {
                history.entries.push(entry);
            }
        }
        history.entries.truncate(capacity);
        history
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn insert_front(&mut self, command: &str) {
        if command.trim().is_empty() {
            return;
        }
        self.entries.retain(|existing| existing != command);
        self.entries.insert(0, command.to_string());
        self.entries.truncate(self.capacity);
    }
}

impl Default for CappedHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl CommandHistory for CappedHistory {
    fn push(&mut self, command: &str) -> Result<(), HistoryError> {
        self.insert_front(command);
        Ok(())
    }

    fn to_list(&self) -> Vec<String> {
        self.entries.clone()
    }

    fn clear(&mut self) -> Result<(), HistoryError> {
        self.entries.clear();
        Ok(())
    }
}

/// History persisted as a JSON array in a file
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    inner: CappedHistory,
}

impl FileHistory {
    /// Open the history file, starting empty if it is missing or unreadable
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Ignoring corrupt command history: {}", e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read command history: {}", e);
                Vec::new()
            }
        };

        Self {
            path,
            inner: CappedHistory::from_entries(entries, capacity),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), HistoryError> {
        let io_err = |source| HistoryError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&self.inner.entries)?;
        std::fs::write(&self.path, content).map_err(io_err)?;
        Ok(())
    }
}

impl CommandHistory for FileHistory {
    fn push(&mut self, command: &str) -> Result<(), HistoryError> {
        self.inner.insert_front(command);
        self.persist()
    }

    fn to_list(&self) -> Vec<String> {
        self.inner.to_list()
    }

    fn clear(&mut self) -> Result<(), HistoryError> {
        self.inner.entries.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(HistoryError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
