//! The watch-token coding scheme: each token this process hands out to
//! `Watch` is tagged with a locally monotonic counter so watch events
//! coming back from the store can be demultiplexed to the right
//! subscriber even if two callers independently chose the same user
//! string.
//!
//! The counter is process-wide `AtomicU32` state shared with request-id
//! generation (`crate::request`).

use std::sync::atomic::{AtomicU32, Ordering};

/// The single process-wide monotonic counter shared by watch-token tags
/// (this module) and request ids (`crate::request`), per §3's "Unique-id
/// generator".
static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// Draw the next id. Wraps modulo 2^32; wrap is expected and not an
/// error over long-lived processes.
pub fn next_id() -> u32 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A watch token: `<tag>:<user>` on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token(String);

impl Token {
    /// Mint a fresh token wrapping `user`, tagged with the next value
    /// from the process-wide counter.
    pub fn of_user_string(user: &str) -> Token {
        Token(format!("{}:{}", next_id(), user))
    }

    /// Adopt a marshalled token verbatim, without regenerating the tag.
    /// Used on the receive side, where the token must compare byte-exact
    /// to what was sent.
    pub fn of_string(raw: impl Into<String>) -> Token {
        Token(raw.into())
    }

    /// The whole composite string, as it appears on the wire.
    pub fn to_debug_string(&self) -> &str {
        &self.0
    }

    /// Recover the user-supplied portion: everything after the first
    /// `:`. May itself contain further colons.
    pub fn to_user_string(&self) -> &str {
        match self.0.split_once(':') {
            Some((_, user)) => user,
            None => &self.0,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
