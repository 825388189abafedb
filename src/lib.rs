//! # Pulsecake
//! A heartbeat based failure detector and the networking it runs on.
//!
//! This is a convenience package which includes all of the sub-projects within
//! Pulsecake:
//!
//! ### Features
//! - `pulsecake_directory` - Maps logical node IDs to network addresses.
//! - `pulsecake_transport` - Length-prefixed point-to-point messaging between node IDs.
//! - `pulsecake_detector` - Sends heartbeats to neighbors and reports the silent ones.

#[cfg(feature = "pulsecake-detector")]
pub use pulsecake_detector as detector;
#[cfg(feature = "pulsecake-directory")]
pub use pulsecake_directory as directory;
#[cfg(feature = "pulsecake-transport")]
pub use pulsecake_transport as transport;
