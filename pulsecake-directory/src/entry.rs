use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single row of the directory table.
///
/// The `id` and `address` are fixed once the entry is created, the registration
/// flag is owned by the directory actor and never leaves it.
pub struct DirectoryEntry {
    id: String,
    address: String,
    #[serde(skip)]
    pub(crate) in_use: bool,
}

impl DirectoryEntry {
    /// Creates a new, unregistered directory entry.
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            in_use: false,
        }
    }

    #[inline]
    /// The logical ID of the entry.
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    /// The `host:port` listen address of the entry.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[derive(Debug, Error)]
/// A directory table could not be loaded.
pub enum TableError {
    #[error("Failed to read directory table: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid directory table: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Parses a JSON array of `{"id": ..., "address": ...}` objects.
pub fn parse_entries(json: &str) -> Result<Vec<DirectoryEntry>, TableError> {
    let entries = serde_json::from_str(json)?;
    Ok(entries)
}

/// Reads and parses a JSON directory table from disk.
pub fn load_entries(path: impl AsRef<Path>) -> Result<Vec<DirectoryEntry>, TableError> {
    let json = std::fs::read_to_string(path)?;
    parse_entries(&json)
}

/// A sample table with listen addresses for some well known figures in
/// distributed systems.
///
/// Nothing should depend on these names being present, any table can be
/// swapped in with [crate::Directory::new].
pub fn sample_entries() -> Vec<DirectoryEntry> {
    vec![
        DirectoryEntry::new("gray", "localhost:4586"),
        DirectoryEntry::new("lamport", "localhost:5486"),
        DirectoryEntry::new("lynch", "localhost:1986"),
        DirectoryEntry::new("mills", "localhost:5905"),
        DirectoryEntry::new("postel", "localhost:1943"),
    ]
}
