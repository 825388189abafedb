//! # Pulsecake Directory
//! An in-memory directory mapping logical node IDs to their listen addresses.
//!
//! The table is owned by a single actor task, every [Directory] handle is a cheap
//! to clone sender into that actor's mailbox. Requests are served strictly in the
//! order they arrive, so the table is never observed or mutated by two operations
//! at once and no locks are needed.
//!
//! ```rust
//! use pulsecake_directory::{Directory, DirectoryEntry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let directory = Directory::new([DirectoryEntry::new("gray", "127.0.0.1:4586")]);
//!
//!     let id = directory.register("").await.expect("Allocate an ID.");
//!     assert_eq!(id, "gray");
//!     assert_eq!(directory.lookup("gray").await.as_deref(), Some("127.0.0.1:4586"));
//! }
//! ```

#[macro_use]
extern crate tracing;

mod actor;
mod entry;
mod error;

use tokio::sync::oneshot;

pub use entry::{load_entries, parse_entries, sample_entries, DirectoryEntry, TableError};
pub use error::DirectoryError;

use crate::actor::Event;

const MAILBOX_CAPACITY: usize = 1000;

#[derive(Clone)]
/// A handle to the directory actor.
pub struct Directory {
    tx: flume::Sender<Event>,
}

impl Directory {
    /// Spawns a new directory actor owning the given entries.
    ///
    /// Entries with an empty ID are skipped as the empty ID is reserved for
    /// allocation requests, duplicate IDs keep their first occurrence.
    ///
    /// This must be called from within a tokio runtime.
    pub fn new(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let table = actor::build_table(entries);
        let (tx, rx) = flume::bounded(MAILBOX_CAPACITY);

        info!(num_entries = table.len(), "Starting directory service.");
        tokio::spawn(actor::run_directory(table, rx));

        Self { tx }
    }

    /// Spawns a directory actor using the [sample_entries] table.
    pub fn sample() -> Self {
        Self::new(sample_entries())
    }

    /// Registers with the directory.
    ///
    /// If `id` is empty the directory picks any unregistered entry, marks it as
    /// in use and returns its ID. Callers must not depend on which ID is chosen.
    pub async fn register(&self, id: &str) -> Result<String, DirectoryError> {
        let (tx, rx) = oneshot::channel();
        let event = Event::Register {
            id: id.to_string(),
            tx,
        };

        if self.tx.send_async(event).await.is_err() {
            return Err(DirectoryError::Unavailable);
        }

        rx.await.map_err(|_| DirectoryError::Unavailable)?
    }

    /// Looks up the address of a known ID, registered or not.
    ///
    /// Returns `None` if the ID is not part of the table.
    pub async fn lookup(&self, id: &str) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        let event = Event::Lookup {
            id: id.to_string(),
            tx,
        };

        if self.tx.send_async(event).await.is_err() {
            warn!(id = %id, "Directory service is not running, lookup failed.");
            return None;
        }

        rx.await.ok().flatten()
    }

    /// Releases a registration.
    ///
    /// This is a privileged operation, only the owner of the registration (or a
    /// test) should call it. Unknown IDs are ignored.
    pub async fn unregister(&self, id: &str) {
        let (tx, rx) = oneshot::channel();
        let event = Event::Unregister {
            id: id.to_string(),
            tx,
        };

        if self.tx.send_async(event).await.is_ok() {
            let _ = rx.await;
        }
    }
}
