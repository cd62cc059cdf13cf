//! Incremental packet decoder: a small explicit state machine, fed
//! arbitrary byte chunks (including one byte at a time), that never
//! blocks and never assumes aligned reads.
//!
//! Structured as a push-based state machine rather than a blocking read
//! loop, since the core cannot assume the channel ever offers a full
//! packet's worth of bytes in one call.

use tracing::{debug, trace};

use crate::op::Op;
use crate::packet::{Packet, ParserLimits, RawHeader};

/// Where the parser currently stands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum State {
    /// Need `n` more bytes before another transition is possible. `n` is
    /// never zero: the instant enough bytes have arrived the parser
    /// advances to the next state in the same `input` call.
    NeedMoreData(usize),
    /// The header named an operation code outside the known `Op` range.
    /// Terminal.
    UnknownOperation(i32),
    /// A framing-level violation (oversized `len`, unparseable header).
    /// Terminal.
    ParserFailed,
    /// A full packet has been decoded. Terminal.
    Complete(Packet),
}

impl State {
    /// How many bytes `input` will consume before the state can change
    /// again. Terminal states report `0`.
    pub fn pending(&self) -> usize {
        match self {
            State::NeedMoreData(n) => *n,
            _ => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, State::NeedMoreData(_))
    }
}

/// Fields captured once the header has been fully decoded.
#[derive(Debug)]
struct Header {
    tid: u32,
    rid: u32,
    ty: Op,
    len: usize,
}

#[derive(Debug)]
enum Phase {
    Header { buf: Vec<u8> },
    Payload { header: Header, buf: Vec<u8> },
    Done,
}

/// An incremental packet parser. One parser decodes exactly one packet;
/// once it reaches a terminal state it is discarded.
#[derive(Debug)]
pub struct Parser {
    phase: Phase,
    state: State,
    limits: ParserLimits,
}

impl Default for Parser {
    fn default() -> Self {
        Parser::start(None)
    }
}

impl Parser {
    /// Start a fresh parser, ready to receive the first header byte.
    /// `limits` defaults to `ParserLimits::protocol_default()` when
    /// `None`, so existing callers don't have to name it.
    pub fn start(limits: Option<ParserLimits>) -> Parser {
        let limits = limits.unwrap_or_default();
        Parser {
            phase: Phase::Header { buf: Vec::with_capacity(limits.header_len) },
            state: State::NeedMoreData(limits.header_len),
            limits,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Feed up to `state().pending()` bytes. Passing more than that is a
    /// caller error; this implementation defensively truncates to the
    /// pending amount rather than panicking or reading past the current
    /// phase's boundary.
    pub fn input(&mut self, bytes: &[u8]) -> &State {
        if self.state.is_terminal() {
            return &self.state;
        }

        let pending = self.state.pending();
        let bytes = if bytes.len() > pending { &bytes[..pending] } else { bytes };
        trace!(n = bytes.len(), pending, "parser received bytes");

        match &mut self.phase {
            Phase::Header { buf } => {
                buf.extend_from_slice(bytes);
                if buf.len() < self.limits.header_len {
                    self.state = State::NeedMoreData(self.limits.header_len - buf.len());
                    return &self.state;
                }
                self.finish_header();
            }
            Phase::Payload { buf, .. } => {
                buf.extend_from_slice(bytes);
                self.finish_payload_if_ready();
            }
            Phase::Done => {}
        }
        &self.state
    }

    fn finish_header(&mut self) {
        let header_bytes = match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Header { buf } => buf,
            other => {
                self.phase = other;
                return;
            }
        };

        let raw = match RawHeader::decode(&header_bytes) {
            Ok(h) => h,
            Err(_) => {
                self.state = State::ParserFailed;
                return;
            }
        };

        let op = match Op::of_i32(raw.ty) {
            Some(op) => op,
            None => {
                debug!(ty = raw.ty, "parser: unknown operation code");
                self.state = State::UnknownOperation(raw.ty);
                return;
            }
        };

        if raw.len > self.limits.max_payload {
            debug!(len = raw.len, max = self.limits.max_payload, "parser: payload exceeds configured maximum");
            self.state = State::ParserFailed;
            return;
        }

        let len = raw.len as usize;
        let header = Header { tid: raw.tid, rid: raw.rid, ty: op, len };
        self.phase = Phase::Payload { header, buf: Vec::with_capacity(len) };
        if len == 0 {
            self.finish_payload_if_ready();
        } else {
            self.state = State::NeedMoreData(len);
        }
    }

    fn finish_payload_if_ready(&mut self) {
        let (header, buf) = match &self.phase {
            Phase::Payload { header, buf } => (header, buf),
            _ => return,
        };
        if buf.len() < header.len {
            self.state = State::NeedMoreData(header.len - buf.len());
            return;
        }

        let (header, buf) = match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Payload { header, buf } => (header, buf),
            _ => unreachable!(),
        };
        self.state = State::Complete(Packet::create(header.tid, header.rid, header.ty, buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::HEADER_LEN;

    fn header_bytes(ty: u32, rid: u32, tid: u32, len: u32) -> Vec<u8> {
        let mut v = Vec::with_capacity(16);
        v.extend_from_slice(&ty.to_le_bytes());
        v.extend_from_slice(&rid.to_le_bytes());
        v.extend_from_slice(&tid.to_le_bytes());
        v.extend_from_slice(&len.to_le_bytes());
        v
    }

    #[test]
    fn zero_length_payload_completes_immediately() {
        // ty=12 (Rm), len=0 — scenario D
        let bytes = header_bytes(12, 0, 0, 0);
        let mut p = Parser::start(None);
        let state = p.input(&bytes);
        match state {
            State::Complete(pkt) => {
                assert_eq!(pkt.ty(), Op::Rm);
                assert_eq!(pkt.data_raw(), b"");
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn unknown_operation_is_terminal() {
        let bytes = header_bytes(99, 0, 0, 0);
        let mut p = Parser::start(None);
        assert_eq!(*p.input(&bytes), State::UnknownOperation(99));
        // further input is ignored, not a panic
        assert_eq!(*p.input(b"more"), State::UnknownOperation(99));
    }

    #[test]
    fn oversized_len_fails() {
        let bytes = header_bytes(2, 0, 0, 4097);
        let mut p = Parser::start(None);
        assert_eq!(*p.input(&bytes), State::ParserFailed);
    }

    #[test]
    fn byte_at_a_time_chunking_matches_whole_feed() {
        let mut pkt_bytes = header_bytes(2, 7, 0, 5);
        pkt_bytes.extend_from_slice(b"/foo\0");

        let mut whole = Parser::start(None);
        let mut final_whole = None;
        for chunk in pkt_bytes.chunks(pkt_bytes.len()) {
            final_whole = Some(whole.input(chunk).clone());
        }

        let mut chunked = Parser::start(None);
        let mut final_chunked = None;
        for b in &pkt_bytes {
            final_chunked = Some(chunked.input(std::slice::from_ref(b)).clone());
        }

        match (final_whole.unwrap(), final_chunked.unwrap()) {
            (State::Complete(a), State::Complete(b)) => {
                assert_eq!(a.tid(), b.tid());
                assert_eq!(a.rid(), b.rid());
                assert_eq!(a.ty(), b.ty());
                assert_eq!(a.data_raw(), b.data_raw());
            }
            other => panic!("expected both Complete, got {other:?}"),
        }
    }

    #[test]
    fn caller_overfeed_is_truncated_not_panicking() {
        // feed the full 16-byte header plus 4 extra bytes in one call
        let mut bytes = header_bytes(2, 0, 0, 0);
        bytes.extend_from_slice(b"xxxx");
        let mut p = Parser::start(None);
        // len=0 so header completion should yield Complete immediately,
        // the 4 extra bytes are simply never consumed by this parser.
        match p.input(&bytes) {
            State::Complete(pkt) => assert_eq!(pkt.data_raw(), b""),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn custom_limits_lower_the_payload_ceiling() {
        let limits = ParserLimits { max_payload: 8, header_len: HEADER_LEN };
        let bytes = header_bytes(2, 0, 0, 9);
        let mut p = Parser::start(Some(limits));
        assert_eq!(*p.input(&bytes), State::ParserFailed);
    }
}
