use std::io;

use thiserror::Error;

/// Everything that can go wrong once bytes are in flight: framing
/// violations, server-reported failures, and channel I/O.
///
/// Constructor-side precondition failures (an overlong payload, an
/// embedded NUL in a field that forbids it) are *not* represented here —
/// those stay `Option`/`None` on the `Request` builders, since the caller
/// is expected to handle them inline rather than propagate them with `?`.
#[derive(Debug, Error)]
pub enum XenstoreError {
    /// The peer sent a header whose `ty` field is outside the known `Op`
    /// range.
    #[error("unknown xenstore operation code {0}")]
    UnknownOperation(i32),

    /// A framing-level protocol violation: an oversized `len`, a short
    /// read mid-packet, or an unparseable header field.
    #[error("xenstore response parser failed: {reason}")]
    ParserFailed { reason: String },

    /// The server reported the requested key does not exist.
    #[error("xenstore: no such entry: {0}")]
    Enoent(String),

    /// The server aborted a transaction due to a conflicting writer; the
    /// caller must retry the whole transaction.
    #[error("xenstore: transaction conflict, retry")]
    Eagain,

    /// The server rejected the request as ill-formed.
    #[error("xenstore: invalid request")]
    Invalid,

    /// Any other server-reported error, or a reply that failed to
    /// unmarshal into the expected shape.
    #[error("xenstore error: {0}")]
    ServerError(String),

    /// The underlying channel returned an I/O error.
    #[error("xenstore channel I/O error: {0}")]
    Io(#[from] io::Error),

    /// The channel reported end-of-stream before a packet completed.
    #[error("xenstore channel closed mid-packet")]
    ChannelClosed,
}

impl XenstoreError {
    /// Map a server `Error` packet's payload name to the matching typed
    /// variant, per §4.9/§8 scenario F.
    pub(crate) fn from_server_name(name: &str) -> XenstoreError {
        match name {
            "ENOENT" => XenstoreError::Enoent(name.to_owned()),
            "EAGAIN" => XenstoreError::Eagain,
            "EINVAL" => XenstoreError::Invalid,
            other => XenstoreError::ServerError(other.to_owned()),
        }
    }
}

pub type XenstoreResult<T> = Result<T, XenstoreError>;
