//! Typed request builders and their receiver-side dual, `Request::parse`.
//!
//! Fields are ASCII decimal or raw bytes, not binary integers, so plain
//! `String`/`Vec<u8>` concatenation with explicit NUL terminators is
//! enough to assemble a payload; there is no need for a cursor/codec
//! abstraction here.

use crate::acl::Acl;
use crate::op::Op;
use crate::packet::{Packet, MAX_PAYLOAD};
use crate::token::{next_id, Token};

/// The receiver-side decoding of a request packet's payload, one variant
/// per operation that carries meaningful data. Produced by
/// `Request::parse`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RequestPayload {
    Debug(Vec<String>),
    Directory(String),
    Read(String),
    GetPerms(String),
    Watch(String, Token),
    Unwatch(String, Token),
    TransactionStart,
    TransactionEnd(bool),
    Introduce(u32, u32, u32),
    Release(u32),
    GetDomainPath(u32),
    Write(String, Vec<u8>),
    Mkdir(String),
    Rm(String),
    SetPerms(String, Acl),
    IsIntroduced(u32),
    Resume(u32),
    SetTarget(u32, u32),
    Restrict(u32),
}

fn non_empty_no_nul(s: &str) -> bool {
    !s.is_empty() && !s.contains('\0')
}

fn path_segment(path: &str) -> Option<Vec<u8>> {
    if !non_empty_no_nul(path) {
        return None;
    }
    let mut buf = path.as_bytes().to_vec();
    buf.push(0);
    Some(buf)
}

fn finish(tid: u32, ty: Op, payload: Vec<u8>) -> Option<Packet> {
    if payload.len() as u32 > MAX_PAYLOAD {
        return None;
    }
    let rid = next_id();
    Some(Packet::create(tid, rid, ty, payload))
}

/// Request builders. Each returns `None` if the assembled payload would
/// exceed the protocol maximum or any field fails a length/character
/// check (empty paths, embedded NULs). `rid` is drawn fresh on every
/// successful call.
pub struct Request;

impl Request {
    pub fn directory(path: &str, tid: u32) -> Option<Packet> {
        finish(tid, Op::Directory, path_segment(path)?)
    }

    pub fn read(path: &str, tid: u32) -> Option<Packet> {
        finish(tid, Op::Read, path_segment(path)?)
    }

    pub fn get_perms(path: &str, tid: u32) -> Option<Packet> {
        finish(tid, Op::GetPerms, path_segment(path)?)
    }

    pub fn mkdir(path: &str, tid: u32) -> Option<Packet> {
        finish(tid, Op::Mkdir, path_segment(path)?)
    }

    pub fn rm(path: &str, tid: u32) -> Option<Packet> {
        finish(tid, Op::Rm, path_segment(path)?)
    }

    /// `path\0value`, deliberately with no trailing NUL — see §9's
    /// design note on this asymmetry.
    pub fn write(path: &str, value: &[u8], tid: u32) -> Option<Packet> {
        if !non_empty_no_nul(path) {
            return None;
        }
        let mut payload = path.as_bytes().to_vec();
        payload.push(0);
        payload.extend_from_slice(value);
        finish(tid, Op::Write, payload)
    }

    pub fn set_perms(path: &str, acl: &Acl, tid: u32) -> Option<Packet> {
        if !non_empty_no_nul(path) {
            return None;
        }
        let mut payload = path.as_bytes().to_vec();
        payload.push(0);
        payload.extend_from_slice(acl.to_string().as_bytes());
        finish(tid, Op::SetPerms, payload)
    }

    /// `path\0token\0`; always sent outside a transaction (`tid == 0`).
    pub fn watch(path: &str, token: &Token) -> Option<Packet> {
        if !non_empty_no_nul(path) || token.to_debug_string().contains('\0') {
            return None;
        }
        let mut payload = path.as_bytes().to_vec();
        payload.push(0);
        payload.extend_from_slice(token.to_debug_string().as_bytes());
        payload.push(0);
        finish(0, Op::Watch, payload)
    }

    pub fn unwatch(path: &str, token: &Token) -> Option<Packet> {
        if !non_empty_no_nul(path) || token.to_debug_string().contains('\0') {
            return None;
        }
        let mut payload = path.as_bytes().to_vec();
        payload.push(0);
        payload.extend_from_slice(token.to_debug_string().as_bytes());
        payload.push(0);
        finish(0, Op::Unwatch, payload)
    }

    pub fn transaction_start() -> Option<Packet> {
        finish(0, Op::TransactionStart, vec![])
    }

    /// `"T"\0` on commit, `"F"\0` on abort.
    pub fn transaction_end(commit: bool, tid: u32) -> Option<Packet> {
        let mut payload = if commit { b"T".to_vec() } else { b"F".to_vec() };
        payload.push(0);
        finish(tid, Op::TransactionEnd, payload)
    }

    pub fn introduce(domid: u32, mfn: u32, port: u32) -> Option<Packet> {
        let payload = format!("{domid}\0{mfn}\0{port}\0").into_bytes();
        finish(0, Op::Introduce, payload)
    }

    pub fn release(domid: u32) -> Option<Packet> {
        finish(0, Op::Release, format!("{domid}\0").into_bytes())
    }

    pub fn resume(domid: u32) -> Option<Packet> {
        finish(0, Op::Resume, format!("{domid}\0").into_bytes())
    }

    pub fn get_domain_path(domid: u32) -> Option<Packet> {
        finish(0, Op::GetDomainPath, format!("{domid}\0").into_bytes())
    }

    pub fn is_introduced(domid: u32) -> Option<Packet> {
        finish(0, Op::IsIntroduced, format!("{domid}\0").into_bytes())
    }

    pub fn restrict(domid: u32) -> Option<Packet> {
        finish(0, Op::Restrict, format!("{domid}\0").into_bytes())
    }

    pub fn set_target(domid: u32, target_domid: u32) -> Option<Packet> {
        finish(0, Op::SetTarget, format!("{domid}\0{target_domid}\0").into_bytes())
    }

    /// `cmd1\0cmd2\0…\0`. Commands must each be non-empty and NUL-free.
    pub fn debug(cmds: &[&str]) -> Option<Packet> {
        let mut payload = Vec::new();
        for cmd in cmds {
            if !non_empty_no_nul(cmd) {
                return None;
            }
            payload.extend_from_slice(cmd.as_bytes());
            payload.push(0);
        }
        finish(0, Op::Debug, payload)
    }

    /// The receiver-side dual of the builders above: split a request
    /// packet's payload according to its `ty` and return a tagged
    /// variant. `None` on any malformed payload (wrong field count, bad
    /// ACL, non-numeric where numeric expected).
    pub fn parse(packet: &Packet) -> Option<RequestPayload> {
        let data = packet.data();
        let text = std::str::from_utf8(data).ok()?;

        match packet.ty() {
            Op::Directory => Some(RequestPayload::Directory(one_path(text)?)),
            Op::Read => Some(RequestPayload::Read(one_path(text)?)),
            Op::GetPerms => Some(RequestPayload::GetPerms(one_path(text)?)),
            Op::Mkdir => Some(RequestPayload::Mkdir(one_path(text)?)),
            Op::Rm => Some(RequestPayload::Rm(one_path(text)?)),
            Op::Write => {
                let raw = packet.data_raw();
                let pos = raw.iter().position(|&b| b == 0)?;
                let path = std::str::from_utf8(&raw[..pos]).ok()?;
                if path.is_empty() {
                    return None;
                }
                Some(RequestPayload::Write(path.to_owned(), raw[pos + 1..].to_vec()))
            }
            Op::SetPerms => {
                let pos = text.find('\0')?;
                let path = &text[..pos];
                if path.is_empty() {
                    return None;
                }
                let acl = Acl::of_string(&text[pos + 1..])?;
                Some(RequestPayload::SetPerms(path.to_owned(), acl))
            }
            Op::Watch => {
                let (path, token) = two_fields(text)?;
                Some(RequestPayload::Watch(path, Token::of_string(token)))
            }
            Op::Unwatch => {
                let (path, token) = two_fields(text)?;
                Some(RequestPayload::Unwatch(path, Token::of_string(token)))
            }
            Op::TransactionStart => Some(RequestPayload::TransactionStart),
            Op::TransactionEnd => match text.trim_end_matches('\0') {
                "T" => Some(RequestPayload::TransactionEnd(true)),
                "F" => Some(RequestPayload::TransactionEnd(false)),
                _ => None,
            },
            Op::Introduce => {
                let fields: Vec<&str> = split_fields(text);
                if fields.len() != 3 {
                    return None;
                }
                Some(RequestPayload::Introduce(
                    fields[0].parse().ok()?,
                    fields[1].parse().ok()?,
                    fields[2].parse().ok()?,
                ))
            }
            Op::Release => Some(RequestPayload::Release(one_u32(text)?)),
            Op::GetDomainPath => Some(RequestPayload::GetDomainPath(one_u32(text)?)),
            Op::IsIntroduced => Some(RequestPayload::IsIntroduced(one_u32(text)?)),
            Op::Resume => Some(RequestPayload::Resume(one_u32(text)?)),
            Op::Restrict => Some(RequestPayload::Restrict(one_u32(text)?)),
            Op::SetTarget => {
                let fields = split_fields(text);
                if fields.len() != 2 {
                    return None;
                }
                Some(RequestPayload::SetTarget(fields[0].parse().ok()?, fields[1].parse().ok()?))
            }
            Op::Debug => {
                let cmds = split_fields(text).into_iter().map(str::to_owned).collect();
                Some(RequestPayload::Debug(cmds))
            }
            Op::WatchEvent | Op::Error => None,
        }
    }
}

fn split_fields(text: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = text.split('\0').collect();
    if fields.last() == Some(&"") {
        fields.pop();
    }
    fields
}

fn one_path(text: &str) -> Option<String> {
    let fields = split_fields(text);
    if fields.len() != 1 || fields[0].is_empty() {
        return None;
    }
    Some(fields[0].to_owned())
}

fn one_u32(text: &str) -> Option<u32> {
    let fields = split_fields(text);
    if fields.len() != 1 {
        return None;
    }
    fields[0].parse().ok()
}

fn two_fields(text: &str) -> Option<(String, String)> {
    let fields = split_fields(text);
    if fields.len() != 2 || fields[0].is_empty() {
        return None;
    }
    Some((fields[0].to_owned(), fields[1].to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_builds_expected_bytes() {
        // scenario A
        let p = Request::read("/foo", 0).unwrap();
        let bytes = p.to_bytes();
        assert_eq!(bytes[0..4], 2u32.to_le_bytes()); // Read = 2
        assert_eq!(bytes[8..12], 0u32.to_le_bytes()); // tid
        assert_eq!(bytes[12..16], 5u32.to_le_bytes()); // len
        assert_eq!(&bytes[16..], b"/foo\0");
    }

    #[test]
    fn write_has_no_trailing_nul() {
        // scenario B
        let p = Request::write("/a", b"hi", 0).unwrap();
        assert_eq!(p.data_raw(), b"/a\0hi");
        assert_eq!(p.ty(), Op::Write);
    }

    #[test]
    fn transaction_end_commit() {
        // scenario C
        let p = Request::transaction_end(true, 7).unwrap();
        assert_eq!(p.ty(), Op::TransactionEnd);
        assert_eq!(p.tid(), 7);
        assert_eq!(p.data_raw(), b"T\0");
    }

    #[test]
    fn empty_path_is_rejected() {
        assert_eq!(Request::read("", 0), None);
    }

    #[test]
    fn embedded_nul_is_rejected() {
        assert_eq!(Request::read("/a\0b", 0), None);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let huge = "x".repeat(5000);
        assert_eq!(Request::write("/a", huge.as_bytes(), 0), None);
    }

    #[test]
    fn parse_round_trips_read() {
        let p = Request::read("/foo/bar", 3).unwrap();
        assert_eq!(Request::parse(&p), Some(RequestPayload::Read("/foo/bar".to_owned())));
    }

    #[test]
    fn parse_round_trips_write() {
        let p = Request::write("/a", b"value", 0).unwrap();
        assert_eq!(
            Request::parse(&p),
            Some(RequestPayload::Write("/a".to_owned(), b"value".to_vec()))
        );
    }

    #[test]
    fn parse_round_trips_introduce() {
        let p = Request::introduce(1, 2, 3).unwrap();
        assert_eq!(Request::parse(&p), Some(RequestPayload::Introduce(1, 2, 3)));
    }

    #[test]
    fn parse_rejects_malformed_introduce() {
        let p = Packet::create(0, 0, Op::Introduce, b"1\0notanumber\03\0".to_vec());
        assert_eq!(Request::parse(&p), None);
    }

    #[test]
    fn rids_are_fresh_each_call() {
        let a = Request::read("/a", 0).unwrap();
        let b = Request::read("/a", 0).unwrap();
        assert_ne!(a.rid(), b.rid());
    }
}
