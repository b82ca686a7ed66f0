//! UDP backend for the transport traits.
//!
//! One [`UdpClient`] per remote participant, each owning a connected socket
//! with a bounded read timeout, and one [`UdpServer`] per process, owning the
//! socket every peer sends to. Acks ride back from the server socket to the
//! client's ephemeral source port, which is why the client waits for them on
//! its own socket.

use crate::traits::{
    DatagramClient, DatagramServer, DatagramSink, ServerAction, ServerHandler, TransportError,
};
use generals_types::Address;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;
use tracing::trace;

/// Receive buffer size. A relay frame is `16 + 4 * path_len` bytes, so this
/// accommodates rosters far beyond anything the round structure supports.
pub const MAX_DATAGRAM: usize = 1500;

/// Socket-level timeouts.
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// How long one `send_with_ack` attempt waits for an acknowledgement
    /// before retransmitting.
    pub ack_timeout: Duration,

    /// How long the server's listen loop waits for a datagram before
    /// reporting an idle timeout to its handler.
    pub idle_timeout: Duration,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_millis(500),
            idle_timeout: Duration::from_secs(3),
        }
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// A client bound to one remote participant.
pub struct UdpClient {
    socket: UdpSocket,
    remote: Address,
}

impl UdpClient {
    /// Bind an ephemeral local port and connect it to `remote`.
    pub fn connect(remote: Address, config: &UdpConfig) -> Result<Self, TransportError> {
        let target = remote.resolve()?;
        let bind_addr = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.connect(target)?;
        socket.set_read_timeout(Some(config.ack_timeout))?;
        Ok(Self { socket, remote })
    }
}

impl DatagramSink for UdpClient {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.socket.send(payload)?;
        Ok(())
    }

    fn remote_address(&self) -> &Address {
        &self.remote
    }
}

impl DatagramClient for UdpClient {
    fn send_with_ack(
        &self,
        payload: &[u8],
        max_attempts: u32,
        is_ack: &dyn Fn(&[u8]) -> bool,
    ) -> Result<(), TransportError> {
        let mut buf = [0u8; MAX_DATAGRAM];
        for attempt in 1..=max_attempts {
            // A silent peer surfaces as ICMP port-unreachable on a connected
            // socket; that is indistinguishable from loss for our purposes,
            // so it consumes the attempt instead of aborting the send.
            if let Err(err) = self.socket.send(payload) {
                if err.kind() != io::ErrorKind::ConnectionRefused {
                    return Err(err.into());
                }
                trace!(to = %self.remote, attempt, "send refused");
                continue;
            }

            match self.socket.recv(&mut buf) {
                Ok(n) if is_ack(&buf[..n]) => return Ok(()),
                Ok(_) => {
                    trace!(to = %self.remote, attempt, "datagram is not the awaited ack");
                }
                Err(err) if is_timeout(&err) => {
                    trace!(to = %self.remote, attempt, "ack timeout");
                }
                Err(err) if err.kind() == io::ErrorKind::ConnectionRefused => {
                    trace!(to = %self.remote, attempt, "peer unreachable");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(TransportError::AckExhausted {
            attempts: max_attempts,
        })
    }
}

/// Replies to the source of a received datagram through the server socket.
struct ReplySink<'a> {
    socket: &'a UdpSocket,
    remote: Address,
    target: SocketAddr,
}

impl DatagramSink for ReplySink<'_> {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.socket.send_to(payload, self.target)?;
        Ok(())
    }

    fn remote_address(&self) -> &Address {
        &self.remote
    }
}

/// The datagram receive side of a process.
pub struct UdpServer {
    socket: UdpSocket,
}

impl UdpServer {
    /// Bind the listening socket.
    pub fn bind(addr: &Address, config: &UdpConfig) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr.resolve()?)?;
        socket.set_read_timeout(Some(config.idle_timeout))?;
        Ok(Self { socket })
    }

    /// The actually bound address, for rosters built with port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

impl DatagramServer for UdpServer {
    fn listen(&mut self, handler: &mut dyn ServerHandler) -> Result<(), TransportError> {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let action = match self.socket.recv_from(&mut buf) {
                Ok((n, src)) => {
                    let peer = ReplySink {
                        socket: &self.socket,
                        remote: Address::from(src),
                        target: src,
                    };
                    handler.on_datagram(&peer, &buf[..n])
                }
                Err(err) if is_timeout(&err) => handler.on_idle(),
                Err(err) => return Err(err.into()),
            };
            if action == ServerAction::Stop {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire;
    use generals_types::{Order, ProcessId, RelayMessage};
    use std::thread;
    use std::time::Instant;

    fn test_config() -> UdpConfig {
        UdpConfig {
            ack_timeout: Duration::from_millis(150),
            idle_timeout: Duration::from_millis(100),
        }
    }

    fn loopback_server() -> (UdpServer, Address) {
        let server = UdpServer::bind(&Address::new("127.0.0.1", 0), &test_config()).unwrap();
        let port = server.local_addr().unwrap().port();
        (server, Address::new("127.0.0.1", port))
    }

    /// Acks every decodable relay with its round, then stops after `remaining`
    /// datagrams.
    struct AckingHandler {
        remaining: usize,
    }

    impl ServerHandler for AckingHandler {
        fn on_datagram(&mut self, peer: &dyn DatagramSink, payload: &[u8]) -> ServerAction {
            if let Ok(msg) = wire::decode_relay(payload) {
                peer.send(&wire::encode_ack(msg.round)).unwrap();
            }
            self.remaining -= 1;
            if self.remaining == 0 {
                ServerAction::Stop
            } else {
                ServerAction::Continue
            }
        }

        fn on_idle(&mut self) -> ServerAction {
            ServerAction::Continue
        }
    }

    /// Replies with a scripted payload per received datagram, then stops.
    struct ScriptedHandler {
        replies: Vec<Vec<u8>>,
        next: usize,
    }

    impl ServerHandler for ScriptedHandler {
        fn on_datagram(&mut self, peer: &dyn DatagramSink, _payload: &[u8]) -> ServerAction {
            peer.send(&self.replies[self.next]).unwrap();
            self.next += 1;
            if self.next == self.replies.len() {
                ServerAction::Stop
            } else {
                ServerAction::Continue
            }
        }

        fn on_idle(&mut self) -> ServerAction {
            ServerAction::Continue
        }
    }

    #[test]
    fn test_send_with_ack_roundtrip() {
        let (mut server, addr) = loopback_server();
        let receiver = thread::spawn(move || {
            server.listen(&mut AckingHandler { remaining: 1 }).unwrap();
        });

        let client = UdpClient::connect(addr, &test_config()).unwrap();
        let payload = wire::encode_relay(&RelayMessage::initial(Order::Attack));
        let is_ack = |buf: &[u8]| matches!(wire::decode_ack(buf), Ok(0));
        client.send_with_ack(&payload, 3, &is_ack).unwrap();
        receiver.join().unwrap();
    }

    #[test]
    fn test_send_with_ack_rejects_wrong_round() {
        // The server acks round 0; a sender waiting on round 5 must exhaust.
        let (mut server, addr) = loopback_server();
        let receiver = thread::spawn(move || {
            server.listen(&mut AckingHandler { remaining: 2 }).unwrap();
        });

        let client = UdpClient::connect(addr, &test_config()).unwrap();
        let payload = wire::encode_relay(&RelayMessage::initial(Order::Attack));
        let is_ack = |buf: &[u8]| matches!(wire::decode_ack(buf), Ok(5));
        let err = client.send_with_ack(&payload, 2, &is_ack).unwrap_err();
        assert!(matches!(err, TransportError::AckExhausted { attempts: 2 }));
        receiver.join().unwrap();
    }

    #[test]
    fn test_send_with_ack_exhausts_on_silence() {
        // Bound but never read: every attempt times out.
        let sink = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = Address::from(sink.local_addr().unwrap());

        let client = UdpClient::connect(addr, &test_config()).unwrap();
        let start = Instant::now();
        let err = client
            .send_with_ack(b"anything", 3, &|_| true)
            .unwrap_err();
        assert!(matches!(err, TransportError::AckExhausted { attempts: 3 }));
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn test_send_with_ack_retransmits_past_noise() {
        // Garbage, then a stale-round ack, then the right one: the third
        // attempt lands inside max_attempts = 3.
        let (mut server, addr) = loopback_server();
        let receiver = thread::spawn(move || {
            server
                .listen(&mut ScriptedHandler {
                    replies: vec![b"noise".to_vec(), wire::encode_ack(0), wire::encode_ack(1)],
                    next: 0,
                })
                .unwrap();
        });

        let client = UdpClient::connect(addr, &test_config()).unwrap();
        let payload =
            wire::encode_relay(&RelayMessage::initial(Order::Attack).forwarded(ProcessId(2)));
        let is_ack = |buf: &[u8]| matches!(wire::decode_ack(buf), Ok(1));
        client.send_with_ack(&payload, 3, &is_ack).unwrap();
        receiver.join().unwrap();
    }

    #[test]
    fn test_listen_reports_idle() {
        struct StopOnIdle {
            idles: usize,
        }
        impl ServerHandler for StopOnIdle {
            fn on_datagram(&mut self, _: &dyn DatagramSink, _: &[u8]) -> ServerAction {
                ServerAction::Continue
            }
            fn on_idle(&mut self) -> ServerAction {
                self.idles += 1;
                ServerAction::Stop
            }
        }

        let (mut server, _) = loopback_server();
        let mut handler = StopOnIdle { idles: 0 };
        let start = Instant::now();
        server.listen(&mut handler).unwrap();
        assert_eq!(handler.idles, 1);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
