//! The channel capability trait and the facade applications hold.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::addr::Ipv4Endpoint;
use crate::datagram::UdpDatagram;
use crate::error::Result;

/// The contract a transport backend implements to move datagrams.
///
/// A channel is open at construction; [`close`](Self::close) is the only
/// state transition and is terminal. Closing must wake any pending
/// [`recv`](Self::recv) with [`ChannelError::Closed`] and make every later
/// operation fail immediately instead of suspending.
///
/// Behavior of multiple concurrently pending `recv` calls on one channel is
/// backend-defined: each inbound datagram resolves exactly one call, with
/// no ordering guarantee across callers. The backends in this crate differ
/// here: [`mock`](crate::backend::mock) serializes receivers on its queue
/// lock, while [`kernel`](crate::backend::kernel) lets the OS pick which
/// pending call a datagram wakes.
///
/// [`ChannelError::Closed`]: crate::error::ChannelError::Closed
#[async_trait]
pub trait UdpTransport: Send + Sync {
    /// Wait for one inbound datagram.
    async fn recv(&self) -> Result<UdpDatagram>;

    /// Hand one payload to the outbound path. Resolving `Ok` means the
    /// payload was accepted for transmission, not that it was delivered;
    /// UDP semantics apply.
    async fn send(&self, dst: Ipv4Endpoint, payload: Bytes) -> Result<()>;

    /// Current liveness, without suspending.
    fn is_closed(&self) -> bool;

    /// Close the channel. Idempotent.
    fn close(&self);
}

/// Type-erased transport backend.
pub type BoxUdpTransport = Box<dyn UdpTransport>;

/// The concrete channel type applications hold.
///
/// Owns one transport backend for its entire lifetime and forwards every
/// operation to it, so callers store and pass a single type whatever moves
/// the bytes underneath. Backend factories such as
/// [`KernelUdpTransport::bind`] produce the transport; the backend type
/// never leaks past this facade.
///
/// [`KernelUdpTransport::bind`]: crate::backend::kernel::KernelUdpTransport::bind
pub struct UdpChannel {
    transport: BoxUdpTransport,
}

impl UdpChannel {
    pub fn new(transport: BoxUdpTransport) -> Self {
        Self { transport }
    }

    /// Wait for one inbound datagram.
    pub async fn recv(&self) -> Result<UdpDatagram> {
        self.transport.recv().await
    }

    /// Send an owned binary payload.
    pub async fn send(&self, dst: Ipv4Endpoint, payload: impl Into<Bytes>) -> Result<()> {
        self.transport.send(dst, payload.into()).await
    }

    /// Send a small textual payload. Copies the text; delivery semantics
    /// are identical to [`send`](Self::send).
    pub async fn send_text(&self, dst: Ipv4Endpoint, text: &str) -> Result<()> {
        self.transport
            .send(dst, Bytes::copy_from_slice(text.as_bytes()))
            .await
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// Close the owned backend. Idempotent; wakes any pending
    /// [`recv`](Self::recv).
    pub fn close(&self) {
        self.transport.close()
    }
}

impl fmt::Debug for UdpChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpChannel")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::backend::mock::MockUdpTransport;
    use crate::error::ChannelError;

    fn ep(s: &str) -> Ipv4Endpoint {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn send_reaches_backend() {
        let (transport, handle) = MockUdpTransport::new();
        let chan = UdpChannel::new(Box::new(transport));

        chan.send_text(ep("10.0.0.1:9000"), "ping").await.unwrap();

        let sent = handle.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination, ep("10.0.0.1:9000"));
        assert_eq!(&sent[0].payload[..], b"ping");
    }

    #[tokio::test]
    async fn send_accepts_owned_payloads() {
        let (transport, handle) = MockUdpTransport::new();
        let chan = UdpChannel::new(Box::new(transport));

        chan.send(ep("10.0.0.1:9000"), Bytes::from_static(b"\x00\x01\x02"))
            .await
            .unwrap();
        chan.send(ep("10.0.0.1:9000"), vec![0xAB; 1200]).await.unwrap();

        let sent = handle.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(&sent[0].payload[..], b"\x00\x01\x02");
        assert_eq!(sent[1].payload.len(), 1200);
    }

    #[tokio::test]
    async fn recv_preloaded_datagram() {
        let (transport, handle) = MockUdpTransport::new();
        handle.inject(ep("192.168.1.5:53"), ep("10.0.0.2:5353"), b"answer");
        let chan = UdpChannel::new(Box::new(transport));

        let mut datagram = chan.recv().await.unwrap();
        assert_eq!(
            datagram.source(),
            Ipv4Endpoint::new(u32::from_be_bytes([192, 168, 1, 5]), 53)
        );
        assert_eq!(datagram.destination(), ep("10.0.0.2:5353"));
        assert_eq!(datagram.destination_port(), 5353);
        assert_eq!(&datagram.payload()[..], b"answer");

        // The payload view is mutable in place.
        datagram.payload_mut()[0] = b'A';
        assert_eq!(&datagram.payload()[..], b"Answer");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (transport, _handle) = MockUdpTransport::new();
        let chan = UdpChannel::new(Box::new(transport));

        assert!(!chan.is_closed());
        chan.close();
        chan.close();
        assert!(chan.is_closed());
    }

    #[tokio::test]
    async fn operations_fail_after_close() {
        let (transport, _handle) = MockUdpTransport::new();
        let chan = UdpChannel::new(Box::new(transport));
        chan.close();

        let send = chan.send_text(ep("10.0.0.1:9000"), "ping").await;
        assert!(matches!(send, Err(ChannelError::Closed)));

        let recv = chan.recv().await;
        assert!(matches!(recv, Err(ChannelError::Closed)));
    }

    #[tokio::test]
    async fn close_unblocks_pending_recv() {
        let (transport, _handle) = MockUdpTransport::new();
        let chan = Arc::new(UdpChannel::new(Box::new(transport)));

        let pending = tokio::spawn({
            let chan = chan.clone();
            async move { chan.recv().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        chan.close();

        let res = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .expect("recv stayed pending after close")
            .expect("recv task panicked");
        assert!(matches!(res, Err(ChannelError::Closed)));
    }
}
