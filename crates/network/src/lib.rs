//! Wire framing and datagram transport.
//!
//! This crate contains everything that touches bytes and sockets:
//!
//! - [`wire`]: the two frame kinds (relay, ack) in network byte order
//! - [`traits`]: the transport seam ([`DatagramClient`], [`DatagramServer`])
//!   the protocol layer is written against
//! - [`udp`]: the UDP backend with per-send bounded retry
//!
//! The protocol state machines in `generals-protocol` depend only on the
//! traits, so tests can drive them with scripted transports while production
//! runs over [`udp`].

pub mod traits;
pub mod udp;
pub mod wire;

pub use traits::{
    DatagramClient, DatagramServer, DatagramSink, ServerAction, ServerHandler, TransportError,
};
pub use udp::{UdpClient, UdpConfig, UdpServer, MAX_DATAGRAM};
pub use wire::{
    decode_ack, decode_relay, encode_ack, encode_relay, WireError, ACK_FRAME, ACK_LEN,
    RELAY_FRAME, RELAY_HEADER_LEN,
};
