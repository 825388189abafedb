//! # Pulsecake Transport
//! Point-to-point messaging between logical node IDs.
//!
//! A [Transport] resolves addresses through a [pulsecake_directory::Directory],
//! so callers only ever deal in IDs. Every message travels on its own TCP
//! connection as a single frame:
//!
//! ```text
//! [u16 big-endian body length][protobuf body: sender (1), recipient (2), payload (3)]
//! ```
//!
//! No frame may be larger than [MAX_MESSAGE_LEN] bytes including its length prefix.
//!
//! ```rust
//! use pulsecake_directory::{Directory, DirectoryEntry};
//! use pulsecake_transport::Transport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let directory = Directory::new([
//!         DirectoryEntry::new("gray", "127.0.0.1:0"),
//!     ]);
//!
//!     let gray = Transport::open("gray", &directory).await?;
//!     println!("gray is listening on {}", gray.local_addr());
//!     gray.close().await?;
//!     Ok(())
//! }
//! ```

#[macro_use]
extern crate tracing;

mod error;
mod server;
mod transport;
pub mod wire;

pub use error::TransportError;
pub use transport::{Transport, TransportBuilder};
pub use wire::Message;

/// No frame, including its length prefix, may be larger than this.
pub const MAX_MESSAGE_LEN: usize = 65535;
