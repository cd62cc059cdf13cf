//! Response builders: each takes the packet it is replying to (to copy
//! `rid`/`tid` for correlation) and the payload, and returns a new
//! packet. Header fields are derived from that context right before
//! framing rather than tracked separately.

use crate::acl::Acl;
use crate::op::Op;
use crate::packet::Packet;

fn reply(req: &Packet, ty: Op, payload: Vec<u8>) -> Packet {
    Packet::create(req.tid(), req.rid(), ty, payload)
}

fn nul_terminated(s: &str) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.push(0);
    v
}

fn list_payload(items: &[impl AsRef<str>]) -> Vec<u8> {
    let mut out = Vec::new();
    for item in items {
        out.extend_from_slice(item.as_ref().as_bytes());
        out.push(0);
    }
    out
}

/// Response builders. All preserve `rid`/`tid` from the request packet.
pub struct Response;

impl Response {
    /// No trailing NUL — mirrors `Request::write`'s asymmetry.
    pub fn read(req: &Packet, value: &[u8]) -> Packet {
        reply(req, Op::Read, value.to_vec())
    }

    pub fn getperms(req: &Packet, acl: &Acl) -> Packet {
        reply(req, Op::GetPerms, acl.to_string().into_bytes())
    }

    pub fn getdomainpath(req: &Packet, path: &str) -> Packet {
        reply(req, Op::GetDomainPath, nul_terminated(path))
    }

    pub fn transaction_start(req: &Packet, new_tid: u32) -> Packet {
        reply(req, Op::TransactionStart, nul_terminated(&new_tid.to_string()))
    }

    pub fn directory(req: &Packet, names: &[impl AsRef<str>]) -> Packet {
        reply(req, Op::Directory, list_payload(names))
    }

    fn ok(req: &Packet, ty: Op) -> Packet {
        reply(req, ty, b"OK\0".to_vec())
    }

    pub fn write(req: &Packet) -> Packet {
        Self::ok(req, Op::Write)
    }

    pub fn mkdir(req: &Packet) -> Packet {
        Self::ok(req, Op::Mkdir)
    }

    pub fn rm(req: &Packet) -> Packet {
        Self::ok(req, Op::Rm)
    }

    pub fn setperms(req: &Packet) -> Packet {
        Self::ok(req, Op::SetPerms)
    }

    pub fn watch(req: &Packet) -> Packet {
        Self::ok(req, Op::Watch)
    }

    pub fn unwatch(req: &Packet) -> Packet {
        Self::ok(req, Op::Unwatch)
    }

    pub fn transaction_end(req: &Packet) -> Packet {
        Self::ok(req, Op::TransactionEnd)
    }

    pub fn introduce(req: &Packet) -> Packet {
        Self::ok(req, Op::Introduce)
    }

    pub fn release(req: &Packet) -> Packet {
        Self::ok(req, Op::Release)
    }

    pub fn set_target(req: &Packet) -> Packet {
        Self::ok(req, Op::SetTarget)
    }

    pub fn restrict(req: &Packet) -> Packet {
        Self::ok(req, Op::Restrict)
    }

    pub fn resume(req: &Packet) -> Packet {
        Self::ok(req, Op::Resume)
    }

    pub fn error(req: &Packet, name: &str) -> Packet {
        reply(req, Op::Error, nul_terminated(name))
    }

    pub fn debug(req: &Packet, lines: &[impl AsRef<str>]) -> Packet {
        reply(req, Op::Debug, list_payload(lines))
    }

    pub fn isintroduced(req: &Packet, introduced: bool) -> Packet {
        let flag = if introduced { "T" } else { "F" };
        reply(req, Op::IsIntroduced, nul_terminated(flag))
    }

    /// Unsolicited: not a reply to any particular request, so `rid` is
    /// always `0` per the watch-event invariant (§3/§8 law 5).
    pub fn watchevent(path: &str, token: &crate::token::Token) -> Packet {
        let mut payload = path.as_bytes().to_vec();
        payload.push(0);
        payload.extend_from_slice(token.to_debug_string().as_bytes());
        payload.push(0);
        Packet::create(0, 0, Op::WatchEvent, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::Perm;
    use crate::token::Token;

    fn sample_request() -> Packet {
        Packet::create(7, 42, Op::Read, b"/foo\0".to_vec())
    }

    #[test]
    fn preserves_rid_and_tid() {
        let req = sample_request();
        let resp = Response::read(&req, b"value");
        assert_eq!(resp.rid(), 42);
        assert_eq!(resp.tid(), 7);
        assert_eq!(resp.ty(), Op::Read);
        assert_eq!(resp.data_raw(), b"value");
    }

    #[test]
    fn ok_responses_carry_ok_payload() {
        let req = sample_request();
        assert_eq!(Response::write(&req).data_raw(), b"OK\0");
    }

    #[test]
    fn error_response() {
        let req = sample_request();
        let resp = Response::error(&req, "ENOENT");
        assert_eq!(resp.ty(), Op::Error);
        assert_eq!(resp.data(), b"ENOENT");
    }

    #[test]
    fn getperms_round_trips_through_acl() {
        let req = sample_request();
        let acl = Acl::new(1, Perm::Read, vec![(2, Perm::RdWr)]);
        let resp = Response::getperms(&req, &acl);
        assert_eq!(Acl::of_string(std::str::from_utf8(resp.data_raw()).unwrap()), Some(acl));
    }

    #[test]
    fn watchevent_always_has_rid_zero() {
        // law 5
        let token = Token::of_user_string("sub");
        let ev = Response::watchevent("/local/domain/1/x", &token);
        assert_eq!(ev.rid(), 0);
        assert_eq!(ev.ty(), Op::WatchEvent);
    }
}
