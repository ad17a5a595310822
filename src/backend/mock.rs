//! In-memory test-double backend.
//!
//! Lets tests drive both ends of a channel without touching sockets:
//! inbound datagrams are injected through a [`MockHandle`] and outbound
//! sends are recorded for inspection.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::addr::Ipv4Endpoint;
use crate::channel::UdpTransport;
use crate::datagram::{BufferedDatagram, UdpDatagram};
use crate::error::{ChannelError, Result};

/// One recorded outbound send.
#[derive(Debug, Clone)]
pub struct SentDatagram {
    pub destination: Ipv4Endpoint,
    pub payload: Bytes,
}

struct MockShared {
    sent: Mutex<Vec<SentDatagram>>,
    closed: CancellationToken,
}

/// Channel transport that moves nothing: sends are recorded, receives are
/// fed from an injected queue.
pub struct MockUdpTransport {
    // Serializes concurrent receivers; a single caller sees injection order.
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<BufferedDatagram>>,
    shared: Arc<MockShared>,
}

/// Test-side handle to a [`MockUdpTransport`].
///
/// Dropping the handle ends the inbound stream: a `recv` waiting on an
/// empty queue then resolves with `Closed`, as if the far side went away.
pub struct MockHandle {
    inject_tx: mpsc::UnboundedSender<BufferedDatagram>,
    shared: Arc<MockShared>,
}

impl MockUdpTransport {
    /// Create a transport plus the handle tests use to drive it.
    pub fn new() -> (Self, MockHandle) {
        let (inject_tx, inject_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(MockShared {
            sent: Mutex::new(Vec::new()),
            closed: CancellationToken::new(),
        });
        let transport = Self {
            inbound: tokio::sync::Mutex::new(inject_rx),
            shared: shared.clone(),
        };
        let handle = MockHandle { inject_tx, shared };
        (transport, handle)
    }
}

impl MockHandle {
    /// Queue one inbound datagram; a pending or future `recv` resolves
    /// with it.
    pub fn inject(&self, source: Ipv4Endpoint, destination: Ipv4Endpoint, payload: &[u8]) {
        let datagram = BufferedDatagram::new(source, destination, BytesMut::from(payload));
        // recv maps a dropped receiver to Closed, so a failed send here
        // needs no separate signal.
        let _ = self.inject_tx.send(datagram);
    }

    /// Snapshot of everything sent through the channel so far.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.shared
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Close the channel from the far side.
    pub fn close_channel(&self) {
        self.shared.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }
}

#[async_trait]
impl UdpTransport for MockUdpTransport {
    async fn recv(&self) -> Result<UdpDatagram> {
        if self.shared.closed.is_cancelled() {
            return Err(ChannelError::Closed);
        }

        let mut rx = self.inbound.lock().await;
        tokio::select! {
            _ = self.shared.closed.cancelled() => Err(ChannelError::Closed),
            next = rx.recv() => match next {
                Some(datagram) => Ok(datagram.into_datagram()),
                None => {
                    // Handle dropped: treat as a close from the far side.
                    self.shared.closed.cancel();
                    Err(ChannelError::Closed)
                }
            },
        }
    }

    async fn send(&self, dst: Ipv4Endpoint, payload: Bytes) -> Result<()> {
        if self.shared.closed.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        self.shared
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentDatagram {
                destination: dst,
                payload,
            });
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    fn close(&self) {
        self.shared.closed.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use super::*;

    fn ep(s: &str) -> Ipv4Endpoint {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn single_receiver_sees_injection_order() {
        let (transport, handle) = MockUdpTransport::new();
        for payload in [b"a", b"b", b"c"] {
            handle.inject(ep("1.1.1.1:1"), ep("2.2.2.2:2"), payload);
        }

        for expected in [b"a", b"b", b"c"] {
            let datagram = transport.recv().await.unwrap();
            assert_eq!(&datagram.payload()[..], expected);
        }
    }

    #[tokio::test]
    async fn concurrent_receivers_each_get_one_datagram() {
        let (transport, handle) = MockUdpTransport::new();
        handle.inject(ep("1.1.1.1:1"), ep("2.2.2.2:2"), b"first");
        handle.inject(ep("1.1.1.1:1"), ep("2.2.2.2:2"), b"second");

        let transport = Arc::new(transport);
        let mut tasks = Vec::new();
        for _ in 0..2 {
            let transport = transport.clone();
            tasks.push(tokio::spawn(async move {
                transport.recv().await.unwrap().payload().to_vec()
            }));
        }

        let mut got = BTreeSet::new();
        for task in tasks {
            got.insert(task.await.unwrap());
        }
        assert_eq!(
            got,
            BTreeSet::from([b"first".to_vec(), b"second".to_vec()])
        );
    }

    #[tokio::test]
    async fn far_side_close_unblocks_recv() {
        let (transport, handle) = MockUdpTransport::new();
        let transport = Arc::new(transport);

        let pending = tokio::spawn({
            let transport = transport.clone();
            async move { transport.recv().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close_channel();

        let res = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .expect("recv stayed pending after close")
            .expect("recv task panicked");
        assert!(matches!(res, Err(ChannelError::Closed)));
        assert!(transport.is_closed());
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn dropped_handle_reads_as_closed() {
        let (transport, handle) = MockUdpTransport::new();
        drop(handle);

        let res = transport.recv().await;
        assert!(matches!(res, Err(ChannelError::Closed)));
        assert!(transport.is_closed());
    }
}
