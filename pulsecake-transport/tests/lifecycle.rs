use std::time::Duration;

use pulsecake_directory::{DirectoryEntry, DirectoryError};
use pulsecake_transport::{wire, Message, Transport, TransportError};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[tokio::test]
async fn test_open_unknown_self() {
    let directory = test_helper::directory_with_ids(&["gray"]);
    let err = Transport::open("asdf", &directory)
        .await
        .err()
        .expect("Unknown ID should fail");
    assert!(matches!(err, TransportError::UnknownSelf(id) if id == "asdf"));
}

#[tokio::test]
async fn test_open_twice_is_refused() -> anyhow::Result<()> {
    let directory = test_helper::directory_with_ids(&["gray"]);
    let _gray = Transport::open("gray", &directory).await?;

    let err = Transport::open("gray", &directory)
        .await
        .err()
        .expect("Second open should fail");
    assert!(matches!(
        err,
        TransportError::Registration(DirectoryError::AlreadyRegistered(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_open_bind_conflict() -> anyhow::Result<()> {
    let addr = test_helper::get_unused_addr();
    let _squatter = std::net::TcpListener::bind(addr)?;
    let directory =
        pulsecake_directory::Directory::new([DirectoryEntry::new("gray", addr.to_string())]);

    let err = Transport::open("gray", &directory)
        .await
        .err()
        .expect("Address is taken");
    assert!(matches!(err, TransportError::BindFailed { .. }));

    // The failed open should not leave the ID registered.
    directory.register("gray").await?;
    Ok(())
}

#[tokio::test]
async fn test_close_releases_listener_and_id() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let directory = test_helper::directory_with_ids(&["gray", "lynch"]);
    let lynch = Transport::open("lynch", &directory).await?;
    let addr = lynch.local_addr();
    lynch.close().await?;

    let err = lynch.close().await.expect_err("Already closed");
    assert!(matches!(err, TransportError::Closed));

    let refused = TcpStream::connect(addr).await;
    assert!(refused.is_err(), "Listener should be released");

    let reopened = Transport::open("lynch", &directory).await?;
    assert_eq!(reopened.local_addr(), addr);

    let gray = Transport::open("gray", &directory).await?;
    gray.send("lynch", &b"hello again"[..]).await?;
    let msg = tokio::time::timeout(Duration::from_secs(5), reopened.recv())
        .await?
        .expect("Message should arrive");
    assert_eq!(msg.payload.as_ref(), b"hello again");
    Ok(())
}

#[tokio::test]
async fn test_receiver_ends_after_close() -> anyhow::Result<()> {
    let directory = test_helper::directory_with_ids(&["gray"]);
    let gray = Transport::open("gray", &directory).await?;
    let receiver = gray.receiver();

    gray.close().await?;

    let next = tokio::time::timeout(Duration::from_secs(5), receiver.recv_async()).await?;
    assert!(next.is_err(), "Receiver should be disconnected");
    Ok(())
}

#[tokio::test]
async fn test_close_drops_undelivered_messages() -> anyhow::Result<()> {
    let directory = test_helper::directory_with_ids(&["gray", "lynch"]);
    let lynch = Transport::open("lynch", &directory).await?;
    let gray = Transport::open("gray", &directory).await?;
    let receiver = lynch.receiver();

    // Nobody reads, so the handler holds the message waiting for a receiver.
    gray.send("lynch", &b"never read"[..]).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    lynch.close().await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let next = tokio::time::timeout(Duration::from_secs(5), receiver.recv_async()).await?;
    assert!(next.is_err(), "Pending message should be dropped on close");

    gray.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let directory = test_helper::directory_with_ids(&["lynch"]);
    let lynch = Transport::open("lynch", &directory).await?;
    let addr = lynch.local_addr();

    // Undecodable body.
    let mut conn = TcpStream::connect(addr).await?;
    conn.write_all(&[0x00, 0x03, 0x0a, 0x10, 0x61]).await?;
    drop(conn);

    // Connection closed mid frame.
    let mut conn = TcpStream::connect(addr).await?;
    conn.write_all(&[0x00, 0x1c, 0x0a, 0x04, 0x67]).await?;
    drop(conn);

    // Declared length exceeds the maximum frame size.
    let mut conn = TcpStream::connect(addr).await?;
    conn.write_all(&[0xff, 0xff, 0x0a, 0x00]).await?;
    drop(conn);

    // Connection closed without sending anything.
    drop(TcpStream::connect(addr).await?);

    let nothing = tokio::time::timeout(Duration::from_millis(250), lynch.recv()).await;
    assert!(nothing.is_err(), "Malformed frames should not be delivered");

    let valid = Message::new("gray", "lynch", &b"still working"[..]);
    let mut conn = TcpStream::connect(addr).await?;
    conn.write_all(&wire::encode_frame(&valid)?).await?;

    let msg = tokio::time::timeout(Duration::from_secs(5), lynch.recv())
        .await?
        .expect("Valid frame should be delivered");
    assert_eq!(msg, valid);
    Ok(())
}

#[tokio::test]
async fn test_slow_connection_does_not_block_others() -> anyhow::Result<()> {
    let directory = test_helper::directory_with_ids(&["gray", "lynch"]);
    let lynch = Transport::open("lynch", &directory).await?;
    let gray = Transport::open("gray", &directory).await?;

    // Half a frame which is never completed.
    let mut stalled = TcpStream::connect(lynch.local_addr()).await?;
    stalled.write_all(&[0x00, 0x1c, 0x0a]).await?;

    gray.send("lynch", &b"not blocked"[..]).await?;
    let msg = tokio::time::timeout(Duration::from_secs(5), lynch.recv())
        .await?
        .expect("Message should arrive");
    assert_eq!(msg.payload.as_ref(), b"not blocked");

    drop(stalled);
    Ok(())
}

#[tokio::test]
async fn test_bounded_inbound_connections() -> anyhow::Result<()> {
    let directory = test_helper::directory_with_ids(&["gray", "lynch"]);
    let lynch = Transport::builder("lynch")
        .with_max_inbound_connections(1)
        .open(&directory)
        .await?;
    let gray = Transport::open("gray", &directory).await?;

    // Sends complete once the frame is in the socket buffer, even while the
    // receiving side is waiting for a permit.
    for i in 0..4u8 {
        gray.send("lynch", vec![i]).await?;
    }

    let mut received = Vec::new();
    for _ in 0..4 {
        let msg = tokio::time::timeout(Duration::from_secs(5), lynch.recv())
            .await?
            .expect("Message should arrive");
        received.push(msg.payload[0]);
    }
    received.sort_unstable();
    assert_eq!(received, vec![0, 1, 2, 3]);

    lynch.close().await?;
    Ok(())
}
