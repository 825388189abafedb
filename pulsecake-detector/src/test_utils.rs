use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use pulsecake_transport::Message;

use crate::Network;

#[derive(Clone, Default)]
/// An in-memory network connecting any number of [ChannelNetwork] endpoints.
///
/// Nodes can be isolated to simulate a crash or a partition, every message to
/// or from an isolated node fails to send.
pub struct ChannelHub {
    inner: Arc<RwLock<HubState>>,
}

#[derive(Default)]
struct HubState {
    endpoints: HashMap<String, flume::Sender<Message>>,
    isolated: HashSet<String>,
}

impl ChannelHub {
    /// Adds a node to the network.
    pub fn join(&self, id: impl Into<String>) -> Arc<ChannelNetwork> {
        let id = id.into();
        let (tx, rx) = flume::unbounded();
        self.inner.write().endpoints.insert(id.clone(), tx);

        Arc::new(ChannelNetwork {
            id,
            hub: self.clone(),
            inbox: rx,
        })
    }

    /// Cuts the node off from every other node.
    pub fn isolate(&self, id: &str) {
        self.inner.write().isolated.insert(id.to_string());
    }

    /// Reconnects a previously isolated node.
    pub fn heal(&self, id: &str) {
        self.inner.write().isolated.remove(id);
    }

    fn route(&self, sender: &str, recipient: &str) -> anyhow::Result<flume::Sender<Message>> {
        let state = self.inner.read();
        if state.isolated.contains(sender) || state.isolated.contains(recipient) {
            return Err(anyhow!("Node '{sender}' cannot reach '{recipient}'"));
        }

        state
            .endpoints
            .get(recipient)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown recipient ID '{recipient}'"))
    }
}

/// A single node of a [ChannelHub].
pub struct ChannelNetwork {
    id: String,
    hub: ChannelHub,
    inbox: flume::Receiver<Message>,
}

#[async_trait]
impl Network for ChannelNetwork {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, recipient: &str, payload: Bytes) -> Result<(), anyhow::Error> {
        let tx = self.hub.route(&self.id, recipient)?;
        tx.send_async(Message::new(self.id.as_str(), recipient, payload))
            .await
            .map_err(|_| anyhow!("Recipient '{recipient}' has shut down"))
    }

    fn receiver(&self) -> flume::Receiver<Message> {
        self.inbox.clone()
    }
}
