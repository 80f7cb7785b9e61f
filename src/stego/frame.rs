//! Bit-level framing shared by the bitmap codecs.
//!
//! A frame is `"GW"` (2 bytes) + payload length (u32 big-endian) + payload,
//! linearized most-significant bit first.

use byteorder::{BigEndian, ByteOrder};

use crate::config;

/// Serialize `payload` into a framed bit sequence (one `u8` of 0/1 per bit).
pub fn frame_bits(payload: &[u8]) -> Vec<u8> {
    let mut header = [0u8; config::FRAME_HEADER_SIZE];
    header[..2].copy_from_slice(&config::FRAME_SIGNATURE);
    BigEndian::write_u32(&mut header[2..], payload.len() as u32);

    let mut bits = Vec::with_capacity((config::FRAME_HEADER_SIZE + payload.len()) * 8);
    push_bits(&mut bits, &header);
    push_bits(&mut bits, payload);
    bits
}

/// Number of carrier bits a framed payload of `payload_len` bytes occupies.
pub fn framed_bit_len(payload_len: usize) -> usize {
    config::FRAME_HEADER_BITS + payload_len * 8
}

/// Append the bits of `bytes`, MSB first.
pub fn push_bits(bits: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
}

/// Pack MSB-first bits into bytes. Trailing bits short of a full byte are dropped.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | (bit & 1)))
        .collect()
}

/// Result of feeding one bit to a [`FrameReader`].
#[derive(Debug, PartialEq, Eq)]
pub enum ReadStep {
    NeedMore,
    /// Signature mismatch or implausible length: not one of our frames.
    Rejected,
    Complete(Vec<u8>),
}

/// Incremental frame parser: header first, then exactly `length * 8` payload bits.
#[derive(Debug)]
pub struct FrameReader {
    max_payload_bits: Option<usize>,
    header: Vec<u8>,
    payload: Vec<u8>,
    expected_bits: Option<usize>,
    done: bool,
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            max_payload_bits: None,
            header: Vec::with_capacity(config::FRAME_HEADER_BITS),
            payload: Vec::new(),
            expected_bits: None,
            done: false,
        }
    }

    /// Reject declared lengths whose payload would need more than `max_payload_bits`.
    pub fn with_capacity_bound(max_payload_bits: usize) -> Self {
        Self {
            max_payload_bits: Some(max_payload_bits),
            ..Self::new()
        }
    }

    pub fn push(&mut self, bit: u8) -> ReadStep {
        if self.done {
            return ReadStep::Rejected;
        }

        let Some(expected) = self.expected_bits else {
            self.header.push(bit & 1);
            if self.header.len() < config::FRAME_HEADER_BITS {
                return ReadStep::NeedMore;
            }
            return self.parse_header();
        };

        self.payload.push(bit & 1);
        if self.payload.len() < expected {
            ReadStep::NeedMore
        } else {
            self.done = true;
            ReadStep::Complete(pack_bits(&self.payload))
        }
    }

    fn parse_header(&mut self) -> ReadStep {
        let header = pack_bits(&self.header);
        if header[..2] != config::FRAME_SIGNATURE {
            self.done = true;
            return ReadStep::Rejected;
        }

        let expected = BigEndian::read_u32(&header[2..]) as usize * 8;
        if matches!(self.max_payload_bits, Some(max) if expected > max) {
            self.done = true;
            return ReadStep::Rejected;
        }
        if expected == 0 {
            self.done = true;
            return ReadStep::Complete(Vec::new());
        }

        self.expected_bits = Some(expected);
        // The declared length is untrusted until the bits actually arrive.
        self.payload.reserve(expected.min(1 << 16));
        ReadStep::NeedMore
    }

    /// Feed bits until the frame completes or is rejected. `None` if the
    /// source runs dry first.
    pub fn read_from<I: IntoIterator<Item = u8>>(mut self, bits: I) -> Option<Vec<u8>> {
        for bit in bits {
            match self.push(bit) {
                ReadStep::NeedMore => continue,
                ReadStep::Rejected => return None,
                ReadStep::Complete(payload) => return Some(payload),
            }
        }
        None
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let bits = frame_bits(b"hi");
        assert_eq!(bits.len(), framed_bit_len(2));
        let bytes = pack_bits(&bits);
        assert_eq!(bytes, [b'G', b'W', 0, 0, 0, 2, b'h', b'i']);
    }

    #[test]
    fn test_bits_are_msb_first() {
        let mut bits = Vec::new();
        push_bits(&mut bits, &[0b1000_0001, 0x40]);
        assert_eq!(bits, [1, 0, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(pack_bits(&bits[..15]), [0b1000_0001]);
    }

    #[test]
    fn test_reader_reads_exact_length() {
        let mut bits = frame_bits("héllo".as_bytes());
        bits.extend_from_slice(&[1, 1, 0, 1]); // trailing noise is ignored
        let payload = FrameReader::new().read_from(bits).unwrap();
        assert_eq!(payload, "héllo".as_bytes());
    }

    #[test]
    fn test_reader_empty_payload() {
        assert_eq!(FrameReader::new().read_from(frame_bits(b"")), Some(Vec::new()));
    }

    #[test]
    fn test_reader_rejects_bad_signature() {
        let mut bits = frame_bits(b"data");
        bits[3] ^= 1;
        let mut reader = FrameReader::new();
        let steps: Vec<ReadStep> = bits[..config::FRAME_HEADER_BITS]
            .iter()
            .map(|&b| reader.push(b))
            .collect();
        assert_eq!(steps.last(), Some(&ReadStep::Rejected));
        assert_eq!(FrameReader::new().read_from(bits), None);
    }

    #[test]
    fn test_reader_truncated_source() {
        let bits = frame_bits(b"truncated");
        assert_eq!(FrameReader::new().read_from(bits[..bits.len() - 1].to_vec()), None);
    }

    #[test]
    fn test_capacity_bound() {
        let bits = frame_bits(&[7u8; 10]);
        assert_eq!(FrameReader::with_capacity_bound(79).read_from(bits.clone()), None);
        assert_eq!(
            FrameReader::with_capacity_bound(80).read_from(bits),
            Some(vec![7u8; 10])
        );
    }
}
