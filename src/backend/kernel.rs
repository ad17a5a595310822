//! Kernel-socket transport backend.
//!
//! Wraps a tokio [`UdpSocket`]. Socket-level options are applied through
//! `socket2` before the socket is handed to tokio, so they take effect at
//! bind time.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde::Deserialize;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::addr::Ipv4Endpoint;
use crate::channel::{UdpChannel, UdpTransport};
use crate::datagram::{BufferedDatagram, UdpDatagram};
use crate::error::{ChannelError, Result};

/// Largest datagram the receive path will accept.
const MAX_DATAGRAM_SIZE: usize = 65535;

/// Socket options applied at bind time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BindOptions {
    /// Allow rebinding a recently used local address (SO_REUSEADDR).
    #[serde(rename = "reuse-address")]
    pub reuse_address: bool,

    /// Kernel receive buffer size in bytes (SO_RCVBUF).
    #[serde(rename = "recv-buffer-size")]
    pub recv_buffer_size: usize,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            reuse_address: false,
            recv_buffer_size: 64 * 1024,
        }
    }
}

/// Channel transport backed by a kernel UDP socket.
pub struct KernelUdpTransport {
    socket: Arc<UdpSocket>,
    local: Ipv4Endpoint,
    closed: CancellationToken,
}

impl KernelUdpTransport {
    /// Bind a socket to `local` (port 0 for an OS-assigned port) and apply
    /// `opts`.
    pub async fn bind(local: Ipv4Endpoint, opts: BindOptions) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        if opts.reuse_address {
            socket.set_reuse_address(true)?;
        }
        socket.set_recv_buffer_size(opts.recv_buffer_size)?;
        // from_std below requires the socket to already be non-blocking.
        socket.set_nonblocking(true)?;
        socket.bind(&SocketAddr::from(local).into())?;

        let socket = UdpSocket::from_std(socket.into())?;
        let bound = match socket.local_addr()? {
            SocketAddr::V4(v4) => Ipv4Endpoint::from(v4),
            SocketAddr::V6(addr) => {
                return Err(ChannelError::Other(anyhow::anyhow!(
                    "bound to non-IPv4 address {addr}"
                )))
            }
        };
        debug!(local = %bound, reuse = opts.reuse_address, "udp socket bound");

        Ok(Self {
            socket: Arc::new(socket),
            local: bound,
            closed: CancellationToken::new(),
        })
    }

    /// The bound local endpoint. Lets callers discover an OS-assigned port
    /// before the transport disappears behind a channel.
    pub fn local_addr(&self) -> Ipv4Endpoint {
        self.local
    }

    /// Box this transport into the channel facade.
    pub fn into_channel(self) -> UdpChannel {
        UdpChannel::new(Box::new(self))
    }
}

#[async_trait]
impl UdpTransport for KernelUdpTransport {
    async fn recv(&self) -> Result<UdpDatagram> {
        if self.closed.is_cancelled() {
            return Err(ChannelError::Closed);
        }

        let mut buf = BytesMut::zeroed(MAX_DATAGRAM_SIZE);
        tokio::select! {
            _ = self.closed.cancelled() => Err(ChannelError::Closed),
            res = self.socket.recv_from(&mut buf) => {
                let (n, from) = res?;
                buf.truncate(n);
                let source = match from {
                    SocketAddr::V4(v4) => Ipv4Endpoint::from(v4),
                    SocketAddr::V6(addr) => {
                        // The socket is IPv4-bound; the kernel should never
                        // hand us anything else.
                        return Err(ChannelError::Other(anyhow::anyhow!(
                            "non-IPv4 peer address {addr}"
                        )));
                    }
                };
                // recv_from does not report the per-packet destination;
                // the bound local address stands in for it.
                Ok(BufferedDatagram::new(source, self.local, buf).into_datagram())
            }
        }
    }

    async fn send(&self, dst: Ipv4Endpoint, payload: Bytes) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        self.socket.send_to(&payload, SocketAddr::from(dst)).await?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn close(&self) {
        // Idempotent; wakes every task parked in recv. The socket itself
        // is released when the transport is dropped.
        self.closed.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> Ipv4Endpoint {
        "127.0.0.1".parse().unwrap()
    }

    #[tokio::test]
    async fn bind_assigns_ephemeral_port() {
        let transport = KernelUdpTransport::bind(loopback(), BindOptions::default())
            .await
            .unwrap();
        let addr = transport.local_addr();
        assert_eq!(addr.octets(), [127, 0, 0, 1]);
        assert!(!addr.is_unspecified_port());
    }

    #[tokio::test]
    async fn bind_with_reuse_address() {
        let opts = BindOptions {
            reuse_address: true,
            ..Default::default()
        };
        let transport = KernelUdpTransport::bind(loopback(), opts).await.unwrap();
        assert!(!transport.is_closed());
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let transport = KernelUdpTransport::bind(loopback(), BindOptions::default())
            .await
            .unwrap();
        let dst = transport.local_addr();
        transport.close();
        transport.close(); // idempotent

        let res = transport.send(dst, Bytes::from_static(b"x")).await;
        assert!(matches!(res, Err(ChannelError::Closed)));
        let res = transport.recv().await;
        assert!(matches!(res, Err(ChannelError::Closed)));
    }

    #[test]
    fn bind_options_deserialize_kebab_case() {
        let opts: BindOptions = serde_json::from_str(
            r#"{"reuse-address": true, "recv-buffer-size": 131072}"#,
        )
        .unwrap();
        assert!(opts.reuse_address);
        assert_eq!(opts.recv_buffer_size, 131072);

        let defaults: BindOptions = serde_json::from_str("{}").unwrap();
        assert!(!defaults.reuse_address);
        assert_eq!(defaults.recv_buffer_size, 64 * 1024);
    }
}
