use async_trait::async_trait;
use bytes::Bytes;
use pulsecake_transport::{Message, Transport};

#[async_trait]
/// The messaging layer the failure detector runs on.
pub trait Network: Send + Sync + 'static {
    /// The ID of the local node.
    fn id(&self) -> &str;

    /// Sends a payload to the given node.
    async fn send(&self, recipient: &str, payload: Bytes) -> Result<(), anyhow::Error>;

    /// The stream of inbound messages.
    fn receiver(&self) -> flume::Receiver<Message>;
}

#[async_trait]
impl Network for Transport {
    fn id(&self) -> &str {
        Transport::id(self)
    }

    async fn send(&self, recipient: &str, payload: Bytes) -> Result<(), anyhow::Error> {
        Transport::send(self, recipient, payload).await?;
        Ok(())
    }

    fn receiver(&self) -> flume::Receiver<Message> {
        Transport::receiver(self)
    }
}
