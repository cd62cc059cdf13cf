//! A client/server wire-protocol library for XenStore, the hierarchical
//! key/value store the Xen hypervisor uses to exchange configuration and
//! control information between the privileged domain and guest domains.
//!
//! This crate is the wire-protocol engine only: the packet framing
//! ([`packet`]), the operation taxonomy ([`op`]), the typed
//! request/response payload layer ([`request`]/[`response`]/
//! [`unmarshal`]), the incremental stream parser ([`parser`]), the
//! watch-token demultiplexing scheme ([`token`]), and a transport-agnostic
//! packet-stream adapter ([`stream`]). It does not authenticate peers,
//! enforce ACLs, manage reconnection, or implement the server-side store —
//! those are external collaborators the embedding application supplies.

mod acl;
mod error;
mod op;
mod packet;
mod parser;
mod request;
mod response;
mod stream;
mod token;
mod unmarshal;

pub use acl::{Acl, AclEntry, Perm};
pub use error::{XenstoreError, XenstoreResult};
pub use op::Op;
pub use packet::{Packet, ParserLimits, HEADER_LEN, MAX_PAYLOAD};
pub use parser::{Parser, State};
pub use request::{Request, RequestPayload};
pub use response::Response;
pub use stream::{Channel, PacketStream};
pub use token::Token;
pub use unmarshal::{response as correlate, Unmarshal};

#[cfg(feature = "tokio-channel")]
pub use stream::TokioChannel;

#[cfg(feature = "futures-channel")]
pub use stream::FuturesChannel;
