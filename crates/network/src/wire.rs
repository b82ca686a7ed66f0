//! Frame encoding and decoding for the two message kinds.
//!
//! # Wire Format
//!
//! Every integer is an unsigned 32-bit value in network byte order.
//!
//! ```text
//! Relay: [type = 1][size][round][order][id] * (round + 1)
//! Ack:   [type = 2][size = 12][round]
//! ```
//!
//! `size` is the total frame length in bytes, so a relay frame is
//! `16 + 4 * path_len` bytes and an ack is always exactly 12. Decoders
//! validate the buffer length against the declared structure and never read
//! past the supplied buffer; any mismatch is a [`WireError`] and the caller
//! drops the datagram.

use generals_types::{Order, ProcessId, RelayMessage};
use thiserror::Error;

/// Type tag of a relay frame.
pub const RELAY_FRAME: u32 = 1;

/// Type tag of an ack frame.
pub const ACK_FRAME: u32 = 2;

/// Fixed part of a relay frame: type, size, round, order.
pub const RELAY_HEADER_LEN: usize = 16;

/// An ack frame is exactly this long: type, size, round.
pub const ACK_LEN: usize = 12;

/// Errors from frame decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer of {0} bytes is shorter than the frame header")]
    TooShort(usize),

    #[error("expected frame type {expected}, got {got}")]
    UnexpectedKind { expected: u32, got: u32 },

    #[error("declared size {declared} does not match buffer length {actual}")]
    SizeMismatch { declared: u32, actual: usize },

    #[error("relay path bytes are not a multiple of 4 ({0} bytes left over)")]
    RaggedPath(usize),

    #[error("unknown order value {0}")]
    UnknownOrder(u32),
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Encode a relay message. The result's length equals its `size` field.
pub fn encode_relay(msg: &RelayMessage) -> Vec<u8> {
    let size = RELAY_HEADER_LEN + 4 * msg.path.len();
    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&RELAY_FRAME.to_be_bytes());
    buf.extend_from_slice(&(size as u32).to_be_bytes());
    buf.extend_from_slice(&msg.round.to_be_bytes());
    buf.extend_from_slice(&msg.order.to_wire().to_be_bytes());
    for id in &msg.path {
        buf.extend_from_slice(&id.0.to_be_bytes());
    }
    buf
}

/// Decode a relay frame.
///
/// Structural validation only: the path is returned as transmitted, and the
/// protocol-level path rules (length, provenance, duplicates) are the message
/// validator's job.
pub fn decode_relay(buf: &[u8]) -> Result<RelayMessage, WireError> {
    if buf.len() < RELAY_HEADER_LEN {
        return Err(WireError::TooShort(buf.len()));
    }
    let kind = read_u32(buf, 0);
    if kind != RELAY_FRAME {
        return Err(WireError::UnexpectedKind {
            expected: RELAY_FRAME,
            got: kind,
        });
    }
    let declared = read_u32(buf, 4);
    if declared as usize != buf.len() {
        return Err(WireError::SizeMismatch {
            declared,
            actual: buf.len(),
        });
    }
    let tail = buf.len() - RELAY_HEADER_LEN;
    if tail % 4 != 0 {
        return Err(WireError::RaggedPath(tail % 4));
    }

    let round = read_u32(buf, 8);
    let raw_order = read_u32(buf, 12);
    let order = Order::from_wire(raw_order).ok_or(WireError::UnknownOrder(raw_order))?;
    let path = (0..tail / 4)
        .map(|i| ProcessId(read_u32(buf, RELAY_HEADER_LEN + 4 * i)))
        .collect();

    Ok(RelayMessage { round, order, path })
}

/// Encode an ack for `round`. Always [`ACK_LEN`] bytes.
pub fn encode_ack(round: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ACK_LEN);
    buf.extend_from_slice(&ACK_FRAME.to_be_bytes());
    buf.extend_from_slice(&(ACK_LEN as u32).to_be_bytes());
    buf.extend_from_slice(&round.to_be_bytes());
    buf
}

/// Decode an ack frame, returning the acknowledged round.
///
/// An ack must be exactly [`ACK_LEN`] bytes; anything else is malformed.
pub fn decode_ack(buf: &[u8]) -> Result<u32, WireError> {
    if buf.len() < ACK_LEN {
        return Err(WireError::TooShort(buf.len()));
    }
    let kind = read_u32(buf, 0);
    if kind != ACK_FRAME {
        return Err(WireError::UnexpectedKind {
            expected: ACK_FRAME,
            got: kind,
        });
    }
    let declared = read_u32(buf, 4);
    if declared as usize != ACK_LEN || buf.len() != ACK_LEN {
        return Err(WireError::SizeMismatch {
            declared,
            actual: buf.len(),
        });
    }
    Ok(read_u32(buf, 8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_relay_exact_bytes() {
        // round 2 means three relayers, so 16 + 12 = 24 bytes.
        let msg = RelayMessage {
            round: 2,
            order: Order::Attack,
            path: vec![ProcessId(0), ProcessId(3), ProcessId(1)],
        };
        let buf = encode_relay(&msg);
        assert_eq!(buf.len(), 24);
        assert_eq!(&buf[0..4], &1u32.to_be_bytes());
        assert_eq!(&buf[4..8], &24u32.to_be_bytes());
        assert_eq!(&buf[8..12], &2u32.to_be_bytes());
        assert_eq!(&buf[12..16], &1u32.to_be_bytes());
        assert_eq!(&buf[16..20], &0u32.to_be_bytes());
        assert_eq!(&buf[20..24], &3u32.to_be_bytes());
        assert_eq!(decode_relay(&buf).unwrap(), msg);
    }

    #[test]
    fn test_ack_exact_bytes() {
        let buf = encode_ack(2);
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[0..4], &2u32.to_be_bytes());
        assert_eq!(&buf[4..8], &12u32.to_be_bytes());
        assert_eq!(&buf[8..12], &2u32.to_be_bytes());
        assert_eq!(decode_ack(&buf).unwrap(), 2);
    }

    #[test]
    fn test_relay_too_short() {
        assert_eq!(decode_relay(&[]), Err(WireError::TooShort(0)));
        assert_eq!(decode_relay(&[0u8; 15]), Err(WireError::TooShort(15)));
    }

    #[test]
    fn test_relay_wrong_kind() {
        // An ack is shorter than a relay header, so pad one out.
        let mut buf = encode_ack(0);
        buf.extend_from_slice(&[0u8; 4]);
        assert!(matches!(
            decode_relay(&buf),
            Err(WireError::UnexpectedKind { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_relay_size_mismatch() {
        let mut buf = encode_relay(&RelayMessage::initial(Order::Attack));
        buf.push(0);
        assert!(matches!(
            decode_relay(&buf),
            Err(WireError::SizeMismatch { declared: 20, .. })
        ));
    }

    #[test]
    fn test_relay_ragged_path() {
        let mut buf = encode_relay(&RelayMessage::initial(Order::Attack));
        buf.extend_from_slice(&[0, 0]);
        // Patch the size so only the tail alignment is at fault.
        let size = (buf.len() as u32).to_be_bytes();
        buf[4..8].copy_from_slice(&size);
        assert_eq!(decode_relay(&buf), Err(WireError::RaggedPath(2)));
    }

    #[test]
    fn test_relay_unknown_order() {
        let mut buf = encode_relay(&RelayMessage::initial(Order::Attack));
        buf[12..16].copy_from_slice(&7u32.to_be_bytes());
        assert_eq!(decode_relay(&buf), Err(WireError::UnknownOrder(7)));
    }

    #[test]
    fn test_ack_wrong_sizes() {
        assert_eq!(decode_ack(&[0u8; 4]), Err(WireError::TooShort(4)));
        let mut buf = encode_ack(1);
        buf.push(0);
        assert!(matches!(
            decode_ack(&buf),
            Err(WireError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_ack_wrong_kind() {
        let buf = encode_relay(&RelayMessage::initial(Order::Attack));
        assert!(matches!(
            decode_ack(&buf),
            Err(WireError::UnexpectedKind { expected: 2, got: 1 })
        ));
    }

    proptest! {
        #[test]
        fn prop_relay_roundtrip(
            round in 0u32..16,
            attack in any::<bool>(),
            raw_path in proptest::collection::vec(0u32..64, 1..12),
        ) {
            let msg = RelayMessage {
                round,
                order: if attack { Order::Attack } else { Order::Retreat },
                path: raw_path.into_iter().map(ProcessId).collect(),
            };
            let buf = encode_relay(&msg);
            prop_assert_eq!(buf.len(), RELAY_HEADER_LEN + 4 * msg.path.len());
            prop_assert_eq!(decode_relay(&buf).unwrap(), msg);
        }

        #[test]
        fn prop_ack_roundtrip(round in any::<u32>()) {
            prop_assert_eq!(decode_ack(&encode_ack(round)).unwrap(), round);
        }

        #[test]
        fn prop_decode_never_panics(buf in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = decode_relay(&buf);
            let _ = decode_ack(&buf);
        }
    }
}
