use std::net::{SocketAddr, TcpListener};

use pulsecake_directory::{Directory, DirectoryEntry};

/// Gets a new socket address allocated by the OS.
pub fn get_unused_addr() -> SocketAddr {
    let socket = TcpListener::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap()
}

/// Creates a directory where every ID maps to a fresh unused local address.
///
/// Must be called from within a tokio runtime.
pub fn directory_with_ids(ids: &[&str]) -> Directory {
    Directory::new(
        ids.iter()
            .map(|id| DirectoryEntry::new(*id, get_unused_addr().to_string())),
    )
}
