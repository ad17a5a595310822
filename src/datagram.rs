//! Datagram values produced by channel receive paths.

use std::fmt;

use bytes::BytesMut;

use crate::addr::Ipv4Endpoint;

/// Backend view of one received datagram.
///
/// Implementations own the payload storage until the wrapping
/// [`UdpDatagram`] is dropped. Datagrams are only constructed by receive
/// paths, so there is no outbound counterpart to this trait.
pub trait InboundDatagram: Send {
    /// The endpoint the datagram arrived from.
    fn source(&self) -> Ipv4Endpoint;
    /// The endpoint the datagram was addressed to.
    fn destination(&self) -> Ipv4Endpoint;
    fn payload(&self) -> &BytesMut;
    fn payload_mut(&mut self) -> &mut BytesMut;
}

/// One received datagram.
///
/// Owns exactly one boxed [`InboundDatagram`], created by the backend whose
/// `recv` produced it, and destroyed with this value.
pub struct UdpDatagram {
    inner: Box<dyn InboundDatagram>,
}

impl UdpDatagram {
    pub fn new(inner: Box<dyn InboundDatagram>) -> Self {
        Self { inner }
    }

    pub fn source(&self) -> Ipv4Endpoint {
        self.inner.source()
    }

    pub fn destination(&self) -> Ipv4Endpoint {
        self.inner.destination()
    }

    pub fn destination_port(&self) -> u16 {
        self.inner.destination().port
    }

    pub fn payload(&self) -> &BytesMut {
        self.inner.payload()
    }

    pub fn payload_mut(&mut self) -> &mut BytesMut {
        self.inner.payload_mut()
    }
}

impl fmt::Debug for UdpDatagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpDatagram")
            .field("source", &self.source())
            .field("destination", &self.destination())
            .field("len", &self.payload().len())
            .finish()
    }
}

/// Straightforward [`InboundDatagram`] for backends that copy each payload
/// into an owned buffer. Backends with pooled or zero-copy storage provide
/// their own implementations instead.
#[derive(Debug)]
pub struct BufferedDatagram {
    source: Ipv4Endpoint,
    destination: Ipv4Endpoint,
    payload: BytesMut,
}

impl BufferedDatagram {
    pub fn new(source: Ipv4Endpoint, destination: Ipv4Endpoint, payload: BytesMut) -> Self {
        Self {
            source,
            destination,
            payload,
        }
    }

    pub fn into_datagram(self) -> UdpDatagram {
        UdpDatagram::new(Box::new(self))
    }
}

impl InboundDatagram for BufferedDatagram {
    fn source(&self) -> Ipv4Endpoint {
        self.source
    }

    fn destination(&self) -> Ipv4Endpoint {
        self.destination
    }

    fn payload(&self) -> &BytesMut {
        &self.payload
    }

    fn payload_mut(&mut self) -> &mut BytesMut {
        &mut self.payload
    }
}
