//! Access-control-list values, as carried by `GET_PERMS`/`SET_PERMS`
//! payloads. The core only parses and re-serializes these; it never
//! enforces them (that lives in the server-side store, out of scope).

/// One of the four permission symbols a XenStore ACL entry can carry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Perm {
    None,
    Read,
    Write,
    RdWr,
}

impl Perm {
    fn to_char(self) -> char {
        match self {
            Perm::None => 'n',
            Perm::Read => 'r',
            Perm::Write => 'w',
            Perm::RdWr => 'b',
        }
    }

    fn of_char(c: char) -> Option<Perm> {
        match c {
            'n' => Some(Perm::None),
            'r' => Some(Perm::Read),
            'w' => Some(Perm::Write),
            'b' => Some(Perm::RdWr),
            _ => None,
        }
    }
}

/// A single per-domain override: `(domid, perm)`.
pub type AclEntry = (u32, Perm);

/// A parsed access-control-list value: the owning domain, the default
/// permission granted to every other domain, and explicit per-domain
/// overrides.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Acl {
    pub owner: u32,
    pub other: Perm,
    pub entries: Vec<AclEntry>,
}

impl Acl {
    pub fn new(owner: u32, other: Perm, entries: Vec<AclEntry>) -> Acl {
        Acl { owner, other, entries }
    }

    /// Parse the wire form `<perm><owner>\0<perm><domid>\0…`. The first
    /// segment sets `owner` + `other`; the rest are per-domain overrides.
    /// Returns `None` on any malformed segment.
    pub fn of_string(s: &str) -> Option<Acl> {
        let mut segments: Vec<&str> = s.split('\0').collect();
        if segments.last() == Some(&"") {
            segments.pop();
        }
        if segments.is_empty() {
            return None;
        }

        let mut iter = segments.into_iter();
        let (owner, other) = parse_segment(iter.next()?)?;
        let mut entries = Vec::new();
        for seg in iter {
            entries.push(parse_segment(seg)?);
        }
        Some(Acl { owner, other, entries })
    }

    /// Inverse of `of_string`. Every segment, including the last, is
    /// terminated by `\0` to match on-wire convention.
    pub fn to_string(&self) -> String {
        let mut out = String::new();
        out.push(self.other.to_char());
        out.push_str(&self.owner.to_string());
        out.push('\0');
        for &(domid, perm) in &self.entries {
            out.push(perm.to_char());
            out.push_str(&domid.to_string());
            out.push('\0');
        }
        out
    }
}

fn parse_segment(seg: &str) -> Option<(u32, Perm)> {
    let mut chars = seg.chars();
    let perm = Perm::of_char(chars.next()?)?;
    let digits = chars.as_str();
    if digits.is_empty() {
        return None;
    }
    let domid: u32 = digits.parse().ok()?;
    Some((domid, perm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_owner_only() {
        let acl = Acl::new(1, Perm::Read, vec![]);
        let s = acl.to_string();
        assert_eq!(s, "r1\0");
        assert_eq!(Acl::of_string(&s), Some(acl));
    }

    #[test]
    fn round_trip_with_entries() {
        let acl = Acl::new(0, Perm::None, vec![(3, Perm::Write), (7, Perm::RdWr)]);
        let s = acl.to_string();
        assert_eq!(s, "n0\0w3\0b7\0");
        assert_eq!(Acl::of_string(&s), Some(acl));
    }

    #[test]
    fn bad_perm_char_is_none() {
        assert_eq!(Acl::of_string("x1\0"), None);
    }

    #[test]
    fn non_digit_domid_is_none() {
        assert_eq!(Acl::of_string("rabc\0"), None);
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(Acl::of_string(""), None);
    }

    #[test]
    fn tolerates_missing_trailing_nul() {
        assert_eq!(Acl::of_string("r1"), Some(Acl::new(1, Perm::Read, vec![])));
    }
}
