use std::io;

use pulsecake_directory::DirectoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Unknown ID '{0}', the transport cannot resolve its own address")]
    /// The transport's own ID is not part of the directory.
    UnknownSelf(String),

    #[error("Failed to register with the directory: {0}")]
    /// The directory refused to hand out the transport's ID.
    Registration(#[from] DirectoryError),

    #[error("Failed to listen on {address}: {source}")]
    /// The listen address could not be bound, usually because it is already in use.
    BindFailed {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Unknown recipient ID '{0}'")]
    /// The recipient of a message is not part of the directory.
    UnknownRecipient(String),

    #[error("Message is {frame_len} bytes, exceeding the maximum frame size")]
    /// The framed message would exceed [crate::MAX_MESSAGE_LEN].
    ///
    /// No connection is opened when this is returned.
    MessageTooLong { frame_len: usize },

    #[error("Failed to send message to '{recipient}': {source}")]
    /// Connecting to or writing to the recipient failed.
    SendFailed {
        recipient: String,
        #[source]
        source: io::Error,
    },

    #[error("The transport has already been closed")]
    Closed,
}
