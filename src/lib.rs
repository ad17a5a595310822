//! Backend-agnostic UDP datagram channels.
//!
//! Application code holds a [`UdpChannel`] and never sees which transport
//! moves the bytes: a kernel socket ([`backend::kernel`]), a user-space
//! stack, or an in-memory test double ([`backend::mock`]). Backends plug
//! in through the [`UdpTransport`] capability trait; received datagrams
//! come back as [`UdpDatagram`] values built on the host-byte-order
//! [`Ipv4Endpoint`] address model.
//!
//! ```no_run
//! use udpchan::backend::kernel::{BindOptions, KernelUdpTransport};
//!
//! # async fn demo() -> udpchan::Result<()> {
//! let transport =
//!     KernelUdpTransport::bind("127.0.0.1".parse()?, BindOptions::default()).await?;
//! let chan = transport.into_channel();
//!
//! chan.send_text("10.0.0.1:9000".parse()?, "ping").await?;
//! let datagram = chan.recv().await?;
//! println!("{} bytes from {}", datagram.payload().len(), datagram.source());
//! chan.close();
//! # Ok(())
//! # }
//! ```

pub mod addr;
pub mod backend;
pub mod channel;
pub mod datagram;
pub mod error;

pub use addr::{Ipv4Endpoint, RawSocketAddress};
pub use channel::{BoxUdpTransport, UdpChannel, UdpTransport};
pub use datagram::{BufferedDatagram, InboundDatagram, UdpDatagram};
pub use error::{ChannelError, ChannelErrorKind, Result};
