//! The transport seam between the protocol layer and the sockets.
//!
//! The protocol crates are written against these traits so that the state
//! machines can be exercised with scripted transports in tests while
//! production runs over [`udp`](crate::udp). All sends are datagrams: no
//! connection state, no delivery guarantee beyond what
//! [`DatagramClient::send_with_ack`] layers on top.

use generals_types::{Address, AddressError};
use thiserror::Error;

/// Error returned by transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no matching acknowledgement after {attempts} attempts")]
    AckExhausted { attempts: u32 },

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// What a listen-loop callback tells the server to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAction {
    /// Keep receiving.
    Continue,
    /// Return from the listen loop.
    Stop,
}

/// One-way datagram sending toward a fixed remote.
///
/// This is the whole interface a receive path needs to answer the sender of
/// a packet, which is why [`ServerHandler::on_datagram`] hands one out.
pub trait DatagramSink {
    /// Fire-and-forget send.
    fn send(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// The remote this sink delivers to. For a sink handed to a server
    /// callback this is the source address of the packet being handled.
    fn remote_address(&self) -> &Address;
}

/// A client bound to one remote participant.
pub trait DatagramClient: DatagramSink + Send + Sync {
    /// Send `payload` and wait for a datagram satisfying `is_ack`.
    ///
    /// Each attempt transmits once and then waits out one bounded receive
    /// window; a timeout or a non-matching datagram consumes the attempt and
    /// triggers a retransmission. Fails with
    /// [`TransportError::AckExhausted`] once `max_attempts` attempts have
    /// been made. The predicate sees the raw buffer.
    fn send_with_ack(
        &self,
        payload: &[u8],
        max_attempts: u32,
        is_ack: &dyn Fn(&[u8]) -> bool,
    ) -> Result<(), TransportError>;
}

/// Callbacks driven by a server's listen loop.
///
/// Both callbacks run on the listening thread, one at a time, so a handler
/// may own mutable state without further synchronisation.
pub trait ServerHandler {
    /// A datagram arrived. `peer` replies to (and names) its source.
    fn on_datagram(&mut self, peer: &dyn DatagramSink, payload: &[u8]) -> ServerAction;

    /// Nothing arrived for the server's idle window.
    fn on_idle(&mut self) -> ServerAction;
}

/// Blocking datagram receive loop.
pub trait DatagramServer {
    /// Dispatch datagrams and idle timeouts to `handler` until a callback
    /// returns [`ServerAction::Stop`].
    fn listen(&mut self, handler: &mut dyn ServerHandler) -> Result<(), TransportError>;
}
