//! In-process transport.
//!
//! Every successful `open` hands a [`MemoryPeer`] to the paired
//! [`MemoryServer`], which plays the server side of the link. Outcomes of
//! future opens can be scripted with [`MemoryTransport::push_behavior`].

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::events::WireFrame;

use super::{CloseReason, HandshakeRequest, Transport, TransportError, TransportEvent, TransportLink};

/// How the next `open` call behaves
#[derive(Debug, Clone)]
pub enum OpenBehavior {
    /// Open and immediately send `connected-ack`
    Accept,
    /// Open but leave the acknowledgement to the peer
    AcceptWithoutAck,
    /// Fail the open
    Reject(TransportError),
}

/// One recorded `open` call
#[derive(Debug, Clone)]
pub struct OpenRecord {
    pub request: HandshakeRequest,
    pub at: Instant,
}

pub struct MemoryTransport {
    script: Mutex<VecDeque<OpenBehavior>>,
    opens: Mutex<Vec<OpenRecord>>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryServer) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let transport = Self {
            script: Mutex::new(VecDeque::new()),
            opens: Mutex::new(Vec::new()),
            peers: peers_tx,
        };
        (transport, MemoryServer { peers: peers_rx })
    }

    /// Queue the behavior of a future `open`. Unscripted opens accept.
    pub fn push_behavior(&self, behavior: OpenBehavior) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(behavior);
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn opens(&self) -> Vec<OpenRecord> {
        self.opens.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, request: &HandshakeRequest) -> Result<TransportLink, TransportError> {
        self.opens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(OpenRecord {
                request: request.clone(),
                at: Instant::now(),
            });

        let behavior = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(OpenBehavior::Accept);

        let auto_ack = match behavior {
            OpenBehavior::Accept => true,
            OpenBehavior::AcceptWithoutAck => false,
            OpenBehavior::Reject(err) => return Err(err),
        };

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        if auto_ack {
            let _ = in_tx.send(TransportEvent::Frame(WireFrame::connected_ack()));
        }

        let peer = MemoryPeer {
            request: request.clone(),
            to_client: in_tx,
            from_client: out_rx,
        };
        if self.peers.send(peer).is_err() {
            tracing::debug!("Memory server gone, link will close immediately");
        }

        Ok(TransportLink {
            outbound: out_tx,
            inbound: in_rx,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Server side of a [`MemoryTransport`]
pub struct MemoryServer {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryServer {
    /// Wait for the next accepted link.
    pub async fn next_peer(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }
}

/// Server end of one memory link.
///
/// Dropping the peer looks like a network failure to the client.
pub struct MemoryPeer {
    pub request: HandshakeRequest,
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<WireFrame>,
}

impl MemoryPeer {
    /// Push a frame to the client. Returns `false` once the client is gone.
    pub fn send(&self, frame: WireFrame) -> bool {
        self.to_client.send(TransportEvent::Frame(frame)).is_ok()
    }

    pub fn emit(&self, event: &str, data: serde_json::Value) -> bool {
        self.send(WireFrame::new(event, data))
    }

    pub fn ack(&self) -> bool {
        self.send(WireFrame::connected_ack())
    }

    /// Next frame from the client; `None` once the client closed the link.
    pub async fn recv(&mut self) -> Option<WireFrame> {
        self.from_client.recv().await
    }

    /// Every frame the client has sent so far, without waiting.
    pub fn drain(&mut self) -> Vec<WireFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Whether the client side has dropped its sender.
    pub fn is_closed_by_client(&self) -> bool {
        self.to_client.is_closed()
    }

    /// Close from the server side with an explicit reason.
    pub fn close(self, reason: CloseReason) {
        let _ = self.to_client.send(TransportEvent::Closed(reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::protocol;

    fn request() -> HandshakeRequest {
        HandshakeRequest {
            endpoint: "memory://test".to_string(),
            token: "t".to_string(),
            platform: "web".to_string(),
        }
    }

    #[tokio::test]
    async fn test_accept_sends_ack_and_pairs_peer() {
        let (transport, mut server) = MemoryTransport::new();
        let mut link = transport.open(&request()).await.unwrap();

        assert_eq!(
            link.inbound.recv().await,
            Some(TransportEvent::Frame(WireFrame::connected_ack()))
        );

        let mut peer = server.next_peer().await.unwrap();
        assert_eq!(peer.request.token, "t");

        link.outbound.send(WireFrame::new("case:status", serde_json::Value::Null)).unwrap();
        assert_eq!(peer.recv().await.unwrap().event, "case:status");
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_rejection() {
        let (transport, _server) = MemoryTransport::new();
        transport.push_behavior(OpenBehavior::Reject(TransportError::Connect("refused".into())));

        assert!(transport.open(&request()).await.is_err());
        assert!(transport.open(&request()).await.is_ok());
        assert_eq!(transport.open_count(), 2);
    }

    #[tokio::test]
    async fn test_dropping_peer_closes_inbound() {
        let (transport, mut server) = MemoryTransport::new();
        transport.push_behavior(OpenBehavior::AcceptWithoutAck);
        let mut link = transport.open(&request()).await.unwrap();

        let peer = server.next_peer().await.unwrap();
        assert!(peer.ack());
        drop(peer);

        match link.inbound.recv().await {
            Some(TransportEvent::Frame(frame)) => assert!(frame.is(protocol::CONNECTED_ACK)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(link.inbound.recv().await.is_none());
    }
}
