//! Total, `Option`-returning projections from a packet into payload
//! values, plus the correlation helper that binds a sent request to its
//! received response and maps server-reported errors to
//! `XenstoreError`.

use tracing::{debug, trace};

use crate::acl::Acl;
use crate::error::XenstoreError;
use crate::op::Op;
use crate::packet::Packet;

/// Projections out of a decoded packet. All total; failure is `None`,
/// never a panic.
pub struct Unmarshal;

impl Unmarshal {
    /// `Some(data)` iff `ty` is a reply carrying a single opaque string
    /// (`Read`, `GetDomainPath`).
    pub fn string(p: &Packet) -> Option<Vec<u8>> {
        match p.ty() {
            Op::Read | Op::GetDomainPath => Some(p.data().to_vec()),
            _ => None,
        }
    }

    /// Split `data` on NUL, dropping a trailing empty segment.
    pub fn list(p: &Packet) -> Option<Vec<String>> {
        let text = std::str::from_utf8(p.data()).ok()?;
        let mut fields: Vec<&str> = text.split('\0').collect();
        if fields.last() == Some(&"") {
            fields.pop();
        }
        Some(fields.into_iter().map(str::to_owned).collect())
    }

    pub fn acl(p: &Packet) -> Option<Acl> {
        let text = std::str::from_utf8(p.data()).ok()?;
        Acl::of_string(text)
    }

    pub fn int(p: &Packet) -> Option<i64> {
        let text = std::str::from_utf8(p.data()).ok()?;
        text.trim_end_matches('\0').parse().ok()
    }

    pub fn int32(p: &Packet) -> Option<i32> {
        let text = std::str::from_utf8(p.data()).ok()?;
        text.trim_end_matches('\0').parse().ok()
    }

    /// `Some(())` iff the payload is an empty ack (`"OK\0"` or empty);
    /// `None` on an `Error` payload.
    pub fn unit(p: &Packet) -> Option<()> {
        if p.ty() == Op::Error {
            return None;
        }
        match p.data() {
            b"" | b"OK" => Some(()),
            _ => None,
        }
    }

    /// `Some(())` iff `ty != Error`. Deliberately does not otherwise
    /// inspect the payload — see §9's design note on trusting the
    /// unmarshaller over re-checking the reply type.
    pub fn ok(p: &Packet) -> Option<()> {
        if p.ty() == Op::Error {
            None
        } else {
            Some(())
        }
    }
}

/// The §4.9 correlation helper. Verifies `received` answers `sent`
/// (matching `rid`/`tid`), maps an `Error` reply to the matching
/// `XenstoreError` variant, and otherwise runs `unmarshal` over
/// `received`, failing with `ServerError(debug_hint)` if it returns
/// `None`.
pub fn response<T>(
    debug_hint: &str,
    sent: &Packet,
    received: &Packet,
    unmarshal: impl FnOnce(&Packet) -> Option<T>,
) -> Result<T, XenstoreError> {
    if received.rid() != sent.rid() || received.tid() != sent.tid() {
        debug!(
            debug_hint,
            sent_rid = sent.rid(),
            sent_tid = sent.tid(),
            received_rid = received.rid(),
            received_tid = received.tid(),
            "correlation mismatch between sent request and received reply"
        );
        return Err(XenstoreError::ServerError(format!(
            "{debug_hint}: reply rid/tid {}/{} does not match request {}/{}",
            received.rid(),
            received.tid(),
            sent.rid(),
            sent.tid()
        )));
    }

    if received.ty() == Op::Error {
        let name = std::str::from_utf8(received.data()).unwrap_or("");
        trace!(debug_hint, name, "server reported an error reply");
        return Err(XenstoreError::from_server_name(name));
    }

    unmarshal(received).ok_or_else(|| XenstoreError::ServerError(debug_hint.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::Perm;

    #[test]
    fn error_maps_to_enoent() {
        // scenario F
        let sent = Packet::create(0, 1, Op::Read, b"/x\0".to_vec());
        let received = Packet::create(0, 1, Op::Error, b"ENOENT\0".to_vec());
        let err = response("read", &sent, &received, Unmarshal::string).unwrap_err();
        assert!(matches!(err, XenstoreError::Enoent(_)));
    }

    #[test]
    fn error_maps_to_eagain_and_invalid() {
        let sent = Packet::create(0, 1, Op::Write, b"/x\0v".to_vec());
        let eagain = Packet::create(0, 1, Op::Error, b"EAGAIN\0".to_vec());
        assert!(matches!(
            response("write", &sent, &eagain, Unmarshal::unit).unwrap_err(),
            XenstoreError::Eagain
        ));

        let invalid = Packet::create(0, 1, Op::Error, b"EINVAL\0".to_vec());
        assert!(matches!(
            response("write", &sent, &invalid, Unmarshal::unit).unwrap_err(),
            XenstoreError::Invalid
        ));
    }

    #[test]
    fn unexpected_server_name_is_generic_server_error() {
        let sent = Packet::create(0, 1, Op::Read, b"/x\0".to_vec());
        let received = Packet::create(0, 1, Op::Error, b"EACCES\0".to_vec());
        match response("read", &sent, &received, Unmarshal::string).unwrap_err() {
            XenstoreError::ServerError(name) => assert_eq!(name, "EACCES"),
            other => panic!("expected ServerError, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_correlation_is_rejected() {
        let sent = Packet::create(0, 1, Op::Read, b"/x\0".to_vec());
        let received = Packet::create(0, 2, Op::Read, b"value".to_vec());
        assert!(response("read", &sent, &received, Unmarshal::string).is_err());
    }

    #[test]
    fn list_drops_trailing_empty_segment() {
        let p = Packet::create(0, 0, Op::Directory, b"a\0b\0c\0".to_vec());
        assert_eq!(Unmarshal::list(&p), Some(vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]));
    }

    #[test]
    fn acl_projection() {
        let acl = Acl::new(1, Perm::Read, vec![]);
        let p = Packet::create(0, 0, Op::GetPerms, acl.to_string().into_bytes());
        assert_eq!(Unmarshal::acl(&p), Some(acl));
    }

    #[test]
    fn ok_rejects_error_type_only() {
        let ok_pkt = Packet::create(0, 0, Op::Write, b"OK\0".to_vec());
        assert_eq!(Unmarshal::ok(&ok_pkt), Some(()));
        let err_pkt = Packet::create(0, 0, Op::Error, b"EINVAL\0".to_vec());
        assert_eq!(Unmarshal::ok(&err_pkt), None);
    }
}
