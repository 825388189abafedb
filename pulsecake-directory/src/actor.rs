use std::collections::BTreeMap;

use tokio::sync::oneshot;

use crate::{DirectoryEntry, DirectoryError};

pub(crate) type Table = BTreeMap<String, DirectoryEntry>;

pub(crate) enum Event {
    Register {
        id: String,
        tx: oneshot::Sender<Result<String, DirectoryError>>,
    },
    Lookup {
        id: String,
        tx: oneshot::Sender<Option<String>>,
    },
    Unregister {
        id: String,
        tx: oneshot::Sender<()>,
    },
}

/// Builds the initial table, the first occurrence of an ID wins.
pub(crate) fn build_table(entries: impl IntoIterator<Item = DirectoryEntry>) -> Table {
    let mut table = Table::new();
    for mut entry in entries {
        if entry.id().is_empty() {
            warn!(address = %entry.address(), "Ignoring directory entry with an empty ID.");
            continue;
        }

        if table.contains_key(entry.id()) {
            warn!(id = %entry.id(), "Ignoring duplicate directory entry.");
            continue;
        }

        entry.in_use = false;
        table.insert(entry.id().to_string(), entry);
    }
    table
}

/// The directory actor.
///
/// This is the only place the table is ever touched, every request is applied
/// in the order it was received.
pub(crate) async fn run_directory(mut table: Table, events: flume::Receiver<Event>) {
    while let Ok(event) = events.recv_async().await {
        match event {
            Event::Register { id, tx } => {
                let result = register(&mut table, &id);
                if let Err(e) = &result {
                    debug!(id = %id, error = %e, "Registration refused.");
                }
                let _ = tx.send(result);
            },
            Event::Lookup { id, tx } => {
                let address = table.get(&id).map(|entry| entry.address().to_string());
                let _ = tx.send(address);
            },
            Event::Unregister { id, tx } => {
                if let Some(entry) = table.get_mut(&id) {
                    entry.in_use = false;
                }
                let _ = tx.send(());
            },
        }
    }

    debug!("Directory handles dropped, stopping actor.");
}

fn register(table: &mut Table, id: &str) -> Result<String, DirectoryError> {
    if id.is_empty() {
        let entry = table
            .values_mut()
            .find(|entry| !entry.in_use)
            .ok_or(DirectoryError::NoAvailableIds)?;
        entry.in_use = true;
        return Ok(entry.id().to_string());
    }

    let entry = table
        .get_mut(id)
        .ok_or_else(|| DirectoryError::NoSuchId(id.to_string()))?;

    if entry.in_use {
        return Err(DirectoryError::AlreadyRegistered(id.to_string()));
    }

    entry.in_use = true;
    Ok(entry.id().to_string())
}
