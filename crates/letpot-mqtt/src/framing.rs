//! Packet framing for device commands.
//!
//! A payload is split into chunks of at most [`MAX_CHUNK`] bytes. Each chunk
//! becomes one packet:
//!
//! ```text
//! non-final: [header, 0x10, id, chunk_len + 4, total_len_lo, total_len_hi, chunk...]
//! final:     [header, 0x00, id, chunk_len, chunk...]
//! ```
//!
//! `header` is `(subtype << 2) | maintype`. Packets are rendered as lowercase
//! hex and must be published in order: there is no sequence field beyond
//! the continuation marker.

use letpot_core::{LetPotError, Result};

/// Maximum packet size on the device link.
pub const MTU: usize = 128;
/// Largest chunk of payload carried by one packet.
pub const MAX_CHUNK: usize = MTU - 6;

const MAIN_TYPE: u8 = 1;
const SUB_TYPE: u8 = 19;
/// First byte of every packet.
pub const PACKET_HEADER: u8 = (SUB_TYPE << 2) | MAIN_TYPE;
/// Marker for "more packets follow".
pub const CONTINUATION: u8 = 16;
/// Marker for the last packet of a payload.
pub const TERMINAL: u8 = 0;

/// Per-connection message id sequence.
///
/// Ids increase by one per packet and are only reset when a new broker
/// connection is established. The wire field is one byte, so the low byte
/// of the counter is what gets sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageIdCounter {
    next: u32,
}

impl MessageIdCounter {
    /// Start at id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next packet will carry.
    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Restart the sequence at 0.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    fn advance(&mut self) -> u8 {
        let wire = self.next.to_le_bytes()[0];
        self.next = self.next.wrapping_add(1);
        wire
    }
}

/// Length of `payload` as carried in the 16-bit total-length field.
pub fn framed_len(payload: &[u8]) -> Result<u16> {
    u16::try_from(payload.len()).map_err(|_| LetPotError::PayloadTooLarge { len: payload.len() })
}

/// Split `payload` into hex-rendered wire packets.
///
/// The returned iterator is lazy: each packet consumes one id from `ids`
/// when it is produced. An empty payload still yields one (empty, final)
/// packet.
///
/// Fails with [`LetPotError::PayloadTooLarge`] when the payload length does
/// not fit the 16-bit total-length field.
pub fn frame_packets<'a>(payload: &'a [u8], ids: &'a mut MessageIdCounter) -> Result<Packets<'a>> {
    let total_len = framed_len(payload)?;
    let count = payload.len().div_ceil(MAX_CHUNK).max(1);
    Ok(Packets {
        payload,
        total_len,
        ids,
        index: 0,
        count,
    })
}

/// Iterator over the packets of one payload. See [`frame_packets`].
#[derive(Debug)]
pub struct Packets<'a> {
    payload: &'a [u8],
    total_len: u16,
    ids: &'a mut MessageIdCounter,
    index: usize,
    count: usize,
}

impl Packets<'_> {
    fn encode(&mut self, index: usize) -> Vec<u8> {
        let start = index * MAX_CHUNK;
        let end = (start + MAX_CHUNK).min(self.payload.len());
        let chunk = &self.payload[start..end];
        let chunk_len = u8::try_from(chunk.len()).unwrap_or(u8::MAX);
        let id = self.ids.advance();

        let mut packet = Vec::with_capacity(chunk.len() + 6);
        if index + 1 < self.count {
            let [len_lo, len_hi] = self.total_len.to_le_bytes();
            packet.extend_from_slice(&[
                PACKET_HEADER,
                CONTINUATION,
                id,
                chunk_len + 4,
                len_lo,
                len_hi,
            ]);
        } else {
            packet.extend_from_slice(&[PACKET_HEADER, TERMINAL, id, chunk_len]);
        }
        packet.extend_from_slice(chunk);
        packet
    }
}

impl Iterator for Packets<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.index >= self.count {
            return None;
        }
        let packet = self.encode(self.index);
        self.index += 1;
        Some(hex::encode(packet))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Packets<'_> {}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    /// Decoded view of one packet.
    #[derive(Debug)]
    struct Decoded {
        more: bool,
        id: u8,
        total_len: Option<u16>,
        chunk: Vec<u8>,
    }

    fn decode(packet: &str) -> Decoded {
        let bytes = hex::decode(packet).unwrap();
        assert_eq!(bytes[0], PACKET_HEADER);
        match bytes[1] {
            CONTINUATION => {
                let chunk = bytes[6..].to_vec();
                assert_eq!(usize::from(bytes[3]), chunk.len() + 4);
                Decoded {
                    more: true,
                    id: bytes[2],
                    total_len: Some(u16::from_le_bytes([bytes[4], bytes[5]])),
                    chunk,
                }
            }
            TERMINAL => {
                let chunk = bytes[4..].to_vec();
                assert_eq!(usize::from(bytes[3]), chunk.len());
                Decoded {
                    more: false,
                    id: bytes[2],
                    total_len: None,
                    chunk,
                }
            }
            other => panic!("unexpected marker {other}"),
        }
    }

    fn frame(payload: &[u8], ids: &mut MessageIdCounter) -> Vec<String> {
        frame_packets(payload, ids).unwrap().collect()
    }

    #[test]
    fn header_byte() {
        assert_eq!(PACKET_HEADER, 0x4d);
        assert_eq!(MAX_CHUNK, 122);
    }

    #[test]
    fn pump_command_is_one_packet() {
        let mut ids = MessageIdCounter::new();
        let command = crate::command::encode_pump_command(true, 300);
        let packets = frame(&command, &mut ids);
        assert_eq!(
            packets,
            vec!["4d00000f41020100012c000000000000000000".to_string()]
        );
    }

    #[test]
    fn empty_payload_is_one_terminal_packet() {
        let mut ids = MessageIdCounter::new();
        let packets = frame(&[], &mut ids);
        assert_eq!(packets, vec!["4d000000".to_string()]);
        assert_eq!(ids.peek(), 1);
    }

    #[test]
    fn exactly_one_chunk() {
        let mut ids = MessageIdCounter::new();
        let payload = vec![0xAB; MAX_CHUNK];
        let packets = frame(&payload, &mut ids);
        assert_eq!(packets.len(), 1);
        let d = decode(&packets[0]);
        assert!(!d.more);
        assert_eq!(d.chunk.len(), MAX_CHUNK);
    }

    #[test]
    fn one_byte_over_splits_in_two() {
        let mut ids = MessageIdCounter::new();
        let payload: Vec<u8> = (0..123u8).collect();
        let packets = frame(&payload, &mut ids);
        assert_eq!(packets.len(), 2);

        let first = decode(&packets[0]);
        assert!(first.more);
        assert_eq!(first.id, 0);
        assert_eq!(first.chunk.len(), 122);
        assert_eq!(first.total_len, Some(123));
        let raw = hex::decode(&packets[0]).unwrap();
        assert_eq!(&raw[..6], &[0x4d, 16, 0, 126, 123, 0]);

        let last = decode(&packets[1]);
        assert!(!last.more);
        assert_eq!(last.id, 1);
        assert_eq!(last.chunk, vec![122]);
    }

    #[test]
    fn total_length_is_little_endian() {
        let mut ids = MessageIdCounter::new();
        let payload = vec![0u8; 300];
        let packets = frame(&payload, &mut ids);
        assert_eq!(packets.len(), 3);
        let raw = hex::decode(&packets[0]).unwrap();
        assert_eq!(raw[4], 44);
        assert_eq!(raw[5], 1);
    }

    #[test]
    fn ids_continue_across_calls() {
        let mut ids = MessageIdCounter::new();
        let a = frame(&[1, 2, 3], &mut ids);
        let b = frame(&vec![0u8; 200], &mut ids);
        assert_eq!(decode(&a[0]).id, 0);
        assert_eq!(decode(&b[0]).id, 1);
        assert_eq!(decode(&b[1]).id, 2);
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn ids_consumed_lazily() {
        let mut ids = MessageIdCounter::new();
        let payload = vec![0u8; 300];
        let mut packets = frame_packets(&payload, &mut ids).unwrap();
        assert_eq!(packets.len(), 3);
        let _ = packets.next();
        assert_eq!(packets.len(), 2);
        drop(packets);
        assert_eq!(ids.peek(), 1);
    }

    #[test]
    fn wire_id_is_low_byte() {
        let mut ids = MessageIdCounter { next: 256 + 7 };
        let packets = frame(&[9], &mut ids);
        assert_eq!(decode(&packets[0]).id, 7);
        assert_eq!(ids.peek(), 264);
    }

    #[test]
    fn reset_restarts_at_zero() {
        let mut ids = MessageIdCounter::new();
        let _ = frame(&[1], &mut ids);
        ids.reset();
        assert_eq!(ids.peek(), 0);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut ids = MessageIdCounter::new();
        let payload = vec![0u8; usize::from(u16::MAX) + 1];
        assert_matches!(
            frame_packets(&payload, &mut ids),
            Err(LetPotError::PayloadTooLarge { len: 65_536 })
        );
        assert_eq!(ids.peek(), 0);
    }

    #[test]
    fn hex_is_lowercase_without_separators() {
        let mut ids = MessageIdCounter::new();
        let packets = frame(&[0xAB, 0xCD], &mut ids);
        assert_eq!(packets[0], "4d000002abcd");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn reassembles_original(payload in proptest::collection::vec(any::<u8>(), 0..1000)) {
                let mut ids = MessageIdCounter::new();
                let packets = frame(&payload, &mut ids);

                let expected = payload.len().div_ceil(MAX_CHUNK).max(1);
                prop_assert_eq!(packets.len(), expected);

                let decoded: Vec<Decoded> = packets.iter().map(|p| decode(p)).collect();
                for (i, d) in decoded.iter().enumerate() {
                    prop_assert_eq!(d.more, i + 1 < decoded.len());
                    prop_assert_eq!(usize::from(d.id), i);
                    if d.more {
                        prop_assert_eq!(d.total_len.map(usize::from), Some(payload.len()));
                    }
                }

                let rebuilt: Vec<u8> = decoded.into_iter().flat_map(|d| d.chunk).collect();
                prop_assert_eq!(rebuilt, payload);
            }

            #[test]
            fn packets_fit_mtu(len in 0usize..2000) {
                let payload = vec![0x5Au8; len];
                let mut ids = MessageIdCounter::new();
                for packet in frame(&payload, &mut ids) {
                    prop_assert!(packet.len() / 2 <= MTU);
                }
            }
        }
    }
}
