//! Transport-agnostic packet stream: turns an ordered byte channel into
//! a sequence of whole request/response packets, using `Parser`
//! internally.
//!
//! `Channel` is the minimal async, suspendable byte-read/byte-write
//! capability the stream needs; the optional `tokio-channel` and
//! `futures-channel` features provide blanket impls over the popular
//! async I/O traits so callers don't have to write their own adapter
//! for a standard runtime.

use async_trait::async_trait;
use tracing::{instrument, trace};

use crate::error::{XenstoreError, XenstoreResult};
use crate::packet::{Packet, ParserLimits};
use crate::parser::{Parser, State};

/// An ordered byte channel whose `read`/`write` may suspend. A single
/// reader and a single writer may operate on one channel concurrently;
/// concurrent calls to the *same* operation on one channel must not be
/// issued (see §5).
#[async_trait]
pub trait Channel: Send {
    /// Read up to `buf.len()` bytes. Returns the number of bytes read;
    /// `0` signals end-of-stream.
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Write up to `buf.len()` bytes. Returns the number of bytes
    /// accepted; `0` signals the peer has gone away.
    async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize>;
}

/// Adapter over one `Channel` presenting a send/receive interface of
/// whole packets.
pub struct PacketStream<C> {
    channel: C,
    limits: ParserLimits,
}

impl<C: Channel> PacketStream<C> {
    /// Build a stream enforcing the protocol's own payload ceiling.
    pub fn new(channel: C) -> PacketStream<C> {
        PacketStream { channel, limits: ParserLimits::default() }
    }

    /// Build a stream enforcing a caller-supplied `ParserLimits` on both
    /// the outbound `send` framing check and the inbound `Parser`.
    pub fn with_limits(channel: C, limits: ParserLimits) -> PacketStream<C> {
        PacketStream { channel, limits }
    }

    /// Borrow the underlying channel, e.g. to inspect or close it.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Serialize `packet` and write it in full, looping until every
    /// byte is drained. Fails if the payload exceeds this stream's
    /// limits, or the channel returns `0` or an I/O error before the
    /// buffer is exhausted.
    #[instrument(skip(self, packet), fields(ty = ?packet.ty(), rid = packet.rid(), tid = packet.tid()))]
    pub async fn send(&mut self, packet: &Packet) -> XenstoreResult<()> {
        let bytes = packet.to_bytes_checked(self.limits)?;
        let mut sent = 0;
        while sent < bytes.len() {
            let n = self.channel.write(&bytes[sent..]).await?;
            if n == 0 {
                return Err(XenstoreError::ChannelClosed);
            }
            sent += n;
        }
        trace!(bytes = bytes.len(), "packet sent");
        Ok(())
    }

    /// Read and decode the next whole packet off the channel.
    #[instrument(skip(self))]
    pub async fn recv(&mut self) -> XenstoreResult<Packet> {
        let mut parser = Parser::start(Some(self.limits));
        loop {
            let pending = parser.state().pending();
            if pending == 0 {
                break;
            }
            let mut scratch = vec![0u8; pending];
            let n = self.channel.read(&mut scratch).await?;
            if n == 0 {
                return Err(XenstoreError::ChannelClosed);
            }
            parser.input(&scratch[..n]);
        }

        match parser.state() {
            State::Complete(packet) => {
                trace!(ty = ?packet.ty(), rid = packet.rid(), tid = packet.tid(), "packet received");
                Ok(packet.clone())
            }
            State::UnknownOperation(i) => Err(XenstoreError::UnknownOperation(*i)),
            State::ParserFailed => Err(XenstoreError::ParserFailed {
                reason: "framing violation while decoding packet".to_owned(),
            }),
            State::NeedMoreData(_) => unreachable!("loop only exits once pending() == 0"),
        }
    }
}

#[cfg(feature = "tokio-channel")]
mod tokio_channel {
    use super::Channel;
    use async_trait::async_trait;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

    /// Wraps any `tokio::io::AsyncRead + AsyncWrite` (e.g. `TcpStream`,
    /// `UnixStream`) as a `Channel`.
    pub struct TokioChannel<T>(pub T);

    #[async_trait]
    impl<T> Channel for TokioChannel<T>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send,
    {
        async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.0.read(buf).await
        }

        async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.write(buf).await
        }
    }
}
#[cfg(feature = "tokio-channel")]
pub use tokio_channel::TokioChannel;

#[cfg(feature = "futures-channel")]
mod futures_channel_impl {
    use super::Channel;
    use async_trait::async_trait;
    use futures_util::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

    /// Wraps any `futures::io::AsyncRead + AsyncWrite` (async-std,
    /// smol, …) as a `Channel`.
    pub struct FuturesChannel<T>(pub T);

    #[async_trait]
    impl<T> Channel for FuturesChannel<T>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send,
    {
        async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.0.read(buf).await
        }

        async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.write(buf).await
        }
    }
}
#[cfg(feature = "futures-channel")]
pub use futures_channel_impl::FuturesChannel;
