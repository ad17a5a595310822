//! IPv4 endpoint values and their raw socket-address layout.
//!
//! Everything outside this module works with [`Ipv4Endpoint`], which keeps
//! both of its fields in host byte order. Translation to the kernel-facing
//! byte layout happens in exactly two places: [`Ipv4Endpoint::to_raw`] and
//! [`Ipv4Endpoint::from_raw`].

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ChannelError;

/// Address family discriminator for the IPv4 view of a raw socket address.
/// AF_INET is 2 on every platform this crate targets.
pub const AF_INET: u16 = 2;

/// Size of the raw address buffer. Matches `sockaddr_storage`, the largest
/// address variant the platform defines.
pub const RAW_SOCKADDR_LEN: usize = 128;

/// An IPv4 address and port, both in host byte order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Ipv4Endpoint {
    pub ip: u32,
    pub port: u16,
}

impl Ipv4Endpoint {
    pub const fn new(ip: u32, port: u16) -> Self {
        Self { ip, port }
    }

    /// Endpoint with an unspecified address (`0.0.0.0`) on the given port.
    pub const fn from_port(port: u16) -> Self {
        Self { ip: 0, port }
    }

    /// The four address octets, most significant first.
    pub fn octets(self) -> [u8; 4] {
        self.ip.to_be_bytes()
    }

    pub fn is_unspecified_ip(self) -> bool {
        self.ip == 0
    }

    pub fn is_unspecified_port(self) -> bool {
        self.port == 0
    }

    /// Encode as a raw socket address: family set to [`AF_INET`], port and
    /// address translated to network byte order, every other byte zero.
    pub fn to_raw(self) -> RawSocketAddress {
        RawSocketAddress::from_ipv4(self)
    }

    /// Decode the IPv4 view of a raw socket address, translating back to
    /// host byte order. The caller is expected to have checked
    /// [`RawSocketAddress::is_ipv4`]; the same byte ranges are read
    /// whatever family the record carries.
    pub fn from_raw(raw: &RawSocketAddress) -> Self {
        Self {
            ip: raw.ipv4_bits(),
            port: raw.port(),
        }
    }
}

impl fmt::Display for Ipv4Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "{}.{}.{}.{}:{}", a, b, c, d, self.port)
    }
}

impl FromStr for Ipv4Endpoint {
    type Err = ChannelError;

    /// Parse `"a.b.c.d"` (port defaults to 0) or `"a.b.c.d:port"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ChannelError::InvalidAddressFormat(s.to_string());

        let mut parts = s.split(':');
        let ip_part = parts.next().unwrap_or_default();
        let port = match parts.next() {
            None => 0,
            Some(p) => p.parse::<u16>().map_err(|_| bad())?,
        };
        if parts.next().is_some() {
            return Err(bad());
        }

        let ip = Ipv4Addr::from_str(ip_part).map_err(|_| bad())?;
        Ok(Self {
            ip: u32::from(ip),
            port,
        })
    }
}

impl From<SocketAddrV4> for Ipv4Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Self {
            ip: u32::from(*addr.ip()),
            port: addr.port(),
        }
    }
}

impl From<Ipv4Endpoint> for SocketAddrV4 {
    fn from(ep: Ipv4Endpoint) -> Self {
        SocketAddrV4::new(Ipv4Addr::from(ep.ip), ep.port)
    }
}

impl From<Ipv4Endpoint> for SocketAddr {
    fn from(ep: Ipv4Endpoint) -> Self {
        SocketAddr::V4(ep.into())
    }
}

impl<'de> Deserialize<'de> for Ipv4Endpoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Fixed-size socket address in the operating system's binary layout.
///
/// The buffer is sized for `sockaddr_storage` so it can hold any address
/// family, but only the IPv4 view is interpreted here: family in native
/// byte order at bytes 0..2, port in network byte order at 2..4, address
/// in network byte order at 4..8 (the `sockaddr_in` offsets). Instances
/// are handed verbatim to OS socket calls by transport backends.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawSocketAddress {
    bytes: [u8; RAW_SOCKADDR_LEN],
}

impl RawSocketAddress {
    /// An all-zero record (family unset).
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; RAW_SOCKADDR_LEN],
        }
    }

    pub fn from_ipv4(ep: Ipv4Endpoint) -> Self {
        let mut raw = Self::zeroed();
        raw.bytes[0..2].copy_from_slice(&AF_INET.to_ne_bytes());
        raw.bytes[2..4].copy_from_slice(&ep.port.to_be_bytes());
        raw.bytes[4..8].copy_from_slice(&ep.ip.to_be_bytes());
        raw
    }

    /// Address family, in host byte order.
    pub fn family(&self) -> u16 {
        u16::from_ne_bytes([self.bytes[0], self.bytes[1]])
    }

    pub fn is_ipv4(&self) -> bool {
        self.family() == AF_INET
    }

    /// Port of the IPv4 view, converted to host byte order.
    pub fn port(&self) -> u16 {
        u16::from_be_bytes([self.bytes[2], self.bytes[3]])
    }

    /// Address bits of the IPv4 view, converted to host byte order.
    pub fn ipv4_bits(&self) -> u32 {
        u32::from_be_bytes([self.bytes[4], self.bytes[5], self.bytes[6], self.bytes[7]])
    }

    /// The full wire-layout buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for RawSocketAddress {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for RawSocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSocketAddress")
            .field("family", &self.family())
            .field("port", &self.port())
            .field("ipv4", &Ipv4Addr::from(self.ipv4_bits()))
            .finish()
    }
}

impl From<Ipv4Endpoint> for RawSocketAddress {
    fn from(ep: Ipv4Endpoint) -> Self {
        Self::from_ipv4(ep)
    }
}

impl From<&RawSocketAddress> for Ipv4Endpoint {
    fn from(raw: &RawSocketAddress) -> Self {
        Self::from_raw(raw)
    }
}
