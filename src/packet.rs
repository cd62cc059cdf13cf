//! The framed unit of the protocol: a 16-byte little-endian header plus
//! a bounded payload.
//!
//! Header layout (all little-endian `u32`), per §6:
//! ```text
//! offset 0:  ty
//! offset 4:  rid
//! offset 8:  tid
//! offset 12: len
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::op::Op;

/// Header size in bytes. Named rather than a literal sprinkled through
/// the parser and packet code.
pub const HEADER_LEN: usize = 16;

/// Protocol-level maximum payload length.
pub const MAX_PAYLOAD: u32 = 4096;

/// Config bounds the parser enforces on decode and `PacketStream`
/// enforces on encode, kept as a `Copy` struct rather than bare
/// constants sprinkled through `Parser`/`Packet` so a future extension
/// protocol with a larger payload ceiling only has to construct a
/// different `ParserLimits`, not touch the state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ParserLimits {
    pub max_payload: u32,
    pub header_len: usize,
}

impl ParserLimits {
    /// The limits this protocol's own wire format was defined against.
    pub const fn protocol_default() -> ParserLimits {
        ParserLimits { max_payload: MAX_PAYLOAD, header_len: HEADER_LEN }
    }
}

impl Default for ParserLimits {
    fn default() -> ParserLimits {
        ParserLimits::protocol_default()
    }
}

/// A single XenStore wire packet: header fields plus raw payload bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Packet {
    tid: u32,
    rid: u32,
    ty: Op,
    payload: Vec<u8>,
}

impl Packet {
    /// Build a packet. `payload.len()` becomes the advertised `len`;
    /// callers must keep it within `MAX_PAYLOAD` themselves (the
    /// `Request`/`Response` builders enforce this; `create` does not,
    /// since it is also used internally by the parser to reconstruct
    /// packets whose length was already validated on decode).
    pub fn create(tid: u32, rid: u32, ty: Op, payload: Vec<u8>) -> Packet {
        Packet { tid, rid, ty, payload }
    }

    pub fn tid(&self) -> u32 {
        self.tid
    }

    pub fn rid(&self) -> u32 {
        self.rid
    }

    pub fn ty(&self) -> Op {
        self.ty
    }

    /// Raw payload bytes, including any trailing NUL.
    pub fn data_raw(&self) -> &[u8] {
        &self.payload
    }

    /// Payload with a single trailing NUL stripped, iff present. This is
    /// the logical string callers want; replying data is conventionally
    /// NUL-terminated on the wire but callers don't want to see that.
    pub fn data(&self) -> &[u8] {
        match self.payload.split_last() {
            Some((0, rest)) => rest,
            _ => &self.payload,
        }
    }

    /// Serialize header + payload. `len` is derived from the current
    /// payload length, not a separately stored field, so the two can
    /// never disagree.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.write_u32::<LittleEndian>(self.ty.to_i32() as u32).unwrap();
        out.write_u32::<LittleEndian>(self.rid).unwrap();
        out.write_u32::<LittleEndian>(self.tid).unwrap();
        out.write_u32::<LittleEndian>(self.payload.len() as u32).unwrap();
        out.extend_from_slice(&self.payload);
        out
    }

    /// Like `to_bytes`, but rejects a payload that exceeds `limits.max_payload`
    /// instead of silently framing an oversized packet.
    pub fn to_bytes_checked(&self, limits: ParserLimits) -> Result<Vec<u8>, crate::error::XenstoreError> {
        if self.payload.len() as u32 > limits.max_payload {
            return Err(crate::error::XenstoreError::ParserFailed {
                reason: format!(
                    "outbound payload of {} bytes exceeds limit of {}",
                    self.payload.len(),
                    limits.max_payload
                ),
            });
        }
        Ok(self.to_bytes())
    }
}

/// The four raw header fields, decoded but not yet validated against
/// `Op`/`MAX_PAYLOAD`. Used internally by `Parser`.
#[derive(Copy, Clone, Debug)]
pub(crate) struct RawHeader {
    pub ty: i32,
    pub rid: u32,
    pub tid: u32,
    pub len: u32,
}

impl RawHeader {
    pub(crate) fn decode(mut buf: &[u8]) -> std::io::Result<RawHeader> {
        debug_assert_eq!(buf.len(), HEADER_LEN);
        let ty = buf.read_u32::<LittleEndian>()? as i32;
        let rid = buf.read_u32::<LittleEndian>()?;
        let tid = buf.read_u32::<LittleEndian>()?;
        let len = buf.read_u32::<LittleEndian>()?;
        Ok(RawHeader { ty, rid, tid, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_bytes_header_layout() {
        let p = Packet::create(0, 42, Op::Read, b"/foo\0".to_vec());
        let bytes = p.to_bytes();
        assert_eq!(bytes[0..4], 2u32.to_le_bytes());
        assert_eq!(bytes[4..8], 42u32.to_le_bytes());
        assert_eq!(bytes[8..12], 0u32.to_le_bytes());
        assert_eq!(bytes[12..16], 5u32.to_le_bytes());
        assert_eq!(&bytes[16..], b"/foo\0");
    }

    #[test]
    fn data_strips_single_trailing_nul() {
        let p = Packet::create(0, 0, Op::Read, b"/foo\0".to_vec());
        assert_eq!(p.data(), b"/foo");
        assert_eq!(p.data_raw(), b"/foo\0");
    }

    #[test]
    fn data_does_not_strip_when_no_trailing_nul() {
        let p = Packet::create(0, 0, Op::Write, b"/a\0hi".to_vec());
        assert_eq!(p.data(), b"/a\0hi");
    }

    #[test]
    fn data_on_empty_payload_is_empty() {
        let p = Packet::create(0, 0, Op::Rm, vec![]);
        assert_eq!(p.data(), b"");
    }

    #[test]
    fn to_bytes_checked_rejects_oversized_payload() {
        let p = Packet::create(0, 0, Op::Write, vec![0u8; 5000]);
        assert!(p.to_bytes_checked(ParserLimits::default()).is_err());
    }

    #[test]
    fn to_bytes_checked_accepts_payload_within_limit() {
        let p = Packet::create(0, 0, Op::Read, b"/foo\0".to_vec());
        assert!(p.to_bytes_checked(ParserLimits::default()).is_ok());
    }
}
