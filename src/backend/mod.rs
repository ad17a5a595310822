//! Transport backends realizing the channel contract.
//!
//! Any type implementing [`UdpTransport`](crate::channel::UdpTransport)
//! can sit behind a [`UdpChannel`](crate::channel::UdpChannel); the two
//! here cover kernel sockets and in-memory test doubles. A user-space
//! stack backend plugs in through the same trait.

pub mod kernel;
pub mod mock;
