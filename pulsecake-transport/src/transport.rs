use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use pulsecake_directory::Directory;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

use crate::wire::{self, Message};
use crate::{server, TransportError};

/// Build a transport using provided settings.
pub struct TransportBuilder {
    id: String,
    max_inbound_connections: Option<usize>,
}

impl TransportBuilder {
    /// Create a new transport builder for the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            max_inbound_connections: None,
        }
    }

    /// Limit how many inbound connections are handled at once.
    ///
    /// Once the limit is reached the transport stops accepting until a handler
    /// finishes. By default every connection gets its own task.
    pub fn with_max_inbound_connections(mut self, limit: usize) -> Self {
        self.max_inbound_connections = Some(limit.max(1));
        self
    }

    /// Opens the transport.
    ///
    /// The transport's address is resolved through the directory, the ID is
    /// registered and a listener is bound on the resolved address.
    pub async fn open(self, directory: &Directory) -> Result<Transport, TransportError> {
        let id = self.id;
        let address = directory
            .lookup(&id)
            .await
            .ok_or_else(|| TransportError::UnknownSelf(id.clone()))?;

        directory.register(&id).await?;

        let bound = TcpListener::bind(&address)
            .await
            .and_then(|listener| listener.local_addr().map(|addr| (listener, addr)));
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                directory.unregister(&id).await;
                return Err(TransportError::BindFailed { address, source });
            },
        };

        let (inbox_tx, inbox_rx) = flume::bounded(0);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let limits = self
            .max_inbound_connections
            .map(|limit| Arc::new(Semaphore::new(limit)));
        let task = server::start_accept_loop(
            id.clone(),
            listener,
            inbox_tx,
            limits,
            shutdown_rx,
        );

        info!(
            id = %id,
            address = %address,
            local_addr = %local_addr,
            max_inbound_connections = ?self.max_inbound_connections,
            "Transport listening."
        );

        Ok(Transport {
            id,
            local_addr,
            directory: directory.clone(),
            inbox: inbox_rx,
            listener: Mutex::new(Some(ListenerHandle {
                shutdown: shutdown_tx,
                task,
            })),
        })
    }
}

struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// A messaging endpoint addressed by its logical ID.
///
/// Every [Transport::send] opens a fresh connection to the recipient, writes a
/// single frame and closes it again. Inbound messages are delivered in order
/// on the [Transport::receiver] channel.
pub struct Transport {
    id: String,
    local_addr: SocketAddr,
    directory: Directory,
    inbox: flume::Receiver<Message>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl Transport {
    /// Opens a transport with the default settings.
    pub async fn open(
        id: impl Into<String>,
        directory: &Directory,
    ) -> Result<Self, TransportError> {
        TransportBuilder::new(id).open(directory).await
    }

    /// Create a new transport builder.
    pub fn builder(id: impl Into<String>) -> TransportBuilder {
        TransportBuilder::new(id)
    }

    #[inline]
    /// The ID this transport is registered as.
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    /// The socket address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sends a payload to the recipient.
    ///
    /// The frame size is checked before any connection is opened, oversized
    /// messages fail with [TransportError::MessageTooLong]. Nothing is retried.
    pub async fn send(
        &self,
        recipient: &str,
        payload: impl Into<Bytes>,
    ) -> Result<(), TransportError> {
        let address = self
            .directory
            .lookup(recipient)
            .await
            .ok_or_else(|| TransportError::UnknownRecipient(recipient.to_string()))?;

        let msg = Message::new(self.id.as_str(), recipient, payload);
        let frame = wire::encode_frame(&msg)?;

        let send_failed = |source| TransportError::SendFailed {
            recipient: recipient.to_string(),
            source,
        };

        let mut stream = TcpStream::connect(&address).await.map_err(send_failed)?;
        stream.write_all(&frame).await.map_err(send_failed)?;
        stream.shutdown().await.map_err(send_failed)?;

        trace!(
            id = %self.id,
            recipient = %recipient,
            address = %address,
            frame_len = frame.len(),
            "Message sent."
        );

        Ok(())
    }

    /// The channel inbound messages are delivered on.
    ///
    /// The channel has no buffer, a connection handler waits until its message
    /// is taken. Every clone of the receiver competes for the same messages.
    pub fn receiver(&self) -> flume::Receiver<Message> {
        self.inbox.clone()
    }

    /// Waits for the next inbound message.
    ///
    /// Returns `None` once the transport is closed and every in-flight
    /// connection handler has finished.
    pub async fn recv(&self) -> Option<Message> {
        self.inbox.recv_async().await.ok()
    }

    /// Stops accepting connections and releases the listener and registration.
    ///
    /// Connection handlers which are already running are not cancelled, but any
    /// message they have not handed to the receiver yet is dropped instead of
    /// waiting for a reader. Closing an already closed transport returns [TransportError::Closed].
    pub async fn close(&self) -> Result<(), TransportError> {
        let handle = self.listener.lock().take();
        let Some(handle) = handle else {
            return Err(TransportError::Closed);
        };

        handle.shutdown.send_replace(true);
        if let Err(e) = handle.task.await {
            warn!(id = %self.id, error = ?e, "Accept loop did not exit cleanly.");
        }

        self.directory.unregister(&self.id).await;
        info!(id = %self.id, "Transport closed.");

        Ok(())
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        // Dropping the shutdown sender stops the accept loop on its own.
        if self.listener.get_mut().take().is_none() {
            return;
        }

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let directory = self.directory.clone();
            let id = self.id.clone();
            handle.spawn(async move { directory.unregister(&id).await });
        }
    }
}
