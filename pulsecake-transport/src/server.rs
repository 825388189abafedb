use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

use crate::wire::{self, Message, MAX_BODY_LEN};

/// How long the accept loop backs off after the listener returns an error.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
/// The reasons an inbound frame is dropped.
///
/// These never leave the transport, they exist for logging only.
pub(crate) enum FrameError {
    #[error("IO error while reading frame: {0}")]
    Io(#[from] io::Error),

    #[error("Declared body length {0} exceeds the maximum frame size")]
    TooLong(usize),

    #[error("Failed to decode frame body: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Starts the accept loop for a bound listener.
///
/// Each accepted connection is handled by its own task. If `limits` is set the
/// loop waits for a permit before accepting, so at most that many connections
/// are handled at once and the remaining ones queue up in the listener backlog.
///
/// The loop stops once `shutdown` is set or its sender is dropped, releasing the
/// listener. Connection handlers which are already running finish reading their
/// frame, but drop it instead of waiting for a receiver once the transport is closed.
pub(crate) fn start_accept_loop(
    id: String,
    listener: TcpListener,
    inbox: flume::Sender<Message>,
    limits: Option<Arc<Semaphore>>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run_accept_loop(id, listener, inbox, limits, shutdown))
}

async fn run_accept_loop(
    id: String,
    listener: TcpListener,
    inbox: flume::Sender<Message>,
    limits: Option<Arc<Semaphore>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let permit = match limits.as_ref() {
            None => None,
            Some(semaphore) => tokio::select! {
                _ = closed(&mut shutdown) => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
            },
        };

        let (stream, remote_addr) = tokio::select! {
            _ = closed(&mut shutdown) => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(id = %id, error = ?e, "Failed to accept connection.");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                },
            },
        };

        trace!(id = %id, remote_addr = %remote_addr, "Accepted connection.");

        let inbox = inbox.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            handle_connection(stream, remote_addr, inbox, shutdown).await;
            drop(permit);
        });
    }

    info!(id = %id, "Transport listener closed.");
}

/// Resolves once the transport is closed or its handle is gone.
pub(crate) async fn closed(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let is_closed = *shutdown.borrow_and_update();
        if is_closed || shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Reads a single frame from the connection and delivers it.
///
/// Malformed frames, connections closing mid-frame and undecodable bodies are
/// dropped without being surfaced to the receiver. So is a valid message that
/// is still waiting for a receiver when the transport closes.
pub(crate) async fn handle_connection<S>(
    mut stream: S,
    remote_addr: SocketAddr,
    inbox: flume::Sender<Message>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: AsyncRead + Unpin,
{
    let msg = match read_frame(&mut stream).await {
        Ok(msg) => msg,
        Err(e) => {
            debug!(remote_addr = %remote_addr, error = %e, "Dropping inbound frame.");
            return;
        },
    };

    // Blocks this connection only, until someone takes the message.
    tokio::select! {
        sent = inbox.send_async(msg) => {
            if sent.is_err() {
                debug!(remote_addr = %remote_addr, "Receiver closed, dropping message.");
            }
        },
        _ = closed(&mut shutdown) => {
            debug!(remote_addr = %remote_addr, "Transport closed, dropping undelivered message.");
        },
    }
}

/// Reads the length prefix followed by exactly that many body bytes.
pub(crate) async fn read_frame<S>(stream: &mut S) -> Result<Message, FrameError>
where
    S: AsyncRead + Unpin,
{
    let body_len = stream.read_u16().await? as usize;
    if body_len > MAX_BODY_LEN {
        return Err(FrameError::TooLong(body_len));
    }

    let mut body = vec![0; body_len];
    stream.read_exact(&mut body).await?;

    let msg = wire::decode_body(&body)?;
    Ok(msg)
}
