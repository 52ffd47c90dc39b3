//! Handshake driver over async byte streams
//!
//! Runs a [`Handshake`] state machine against any tokio stream using only
//! exact reads and full writes. Each read can be bounded by a caller
//! supplied deadline; the handshake itself never times out.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::protocol::handshake::{Handshake, HandshakeRole};
use crate::protocol::offset::OffsetScheme;

/// Stream that completed a complex handshake
///
/// Ready for the RTMP chunk layer; nothing of the handshake is left
/// unread on it.
#[derive(Debug)]
pub struct HandshakenStream<S> {
    stream: S,
    role: HandshakeRole,
    peer_scheme: Option<OffsetScheme>,
}

impl<S> HandshakenStream<S> {
    pub fn role(&self) -> HandshakeRole {
        self.role
    }

    /// Offset scheme the peer used for its digest
    pub fn peer_scheme(&self) -> Option<OffsetScheme> {
        self.peer_scheme
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Hand the stream over to the message layer
    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Read exactly `buf.len()` bytes, optionally within `deadline`
pub async fn read_exact_within<R>(reader: &mut R, buf: &mut [u8], deadline: Option<Duration>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match deadline {
        Some(limit) => {
            timeout(limit, reader.read_exact(buf))
                .await
                .map_err(|_| Error::Timeout)??;
        }
        None => {
            reader.read_exact(buf).await?;
        }
    }
    Ok(())
}

/// Write all of `data` and flush
pub async fn write_all_flush<W>(writer: &mut W, data: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Perform the client side of the complex handshake on `stream`
pub async fn client_handshake<S>(stream: S, read_timeout: Option<Duration>) -> Result<HandshakenStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    drive(stream, HandshakeRole::Client, read_timeout).await
}

/// Perform the server side of the complex handshake on `stream`
pub async fn server_handshake<S>(stream: S, read_timeout: Option<Duration>) -> Result<HandshakenStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    drive(stream, HandshakeRole::Server, read_timeout).await
}

async fn drive<S>(mut stream: S, role: HandshakeRole, read_timeout: Option<Duration>) -> Result<HandshakenStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut handshake = Handshake::new(role);

    match exchange(&mut stream, &mut handshake, read_timeout).await {
        Ok(()) => Ok(HandshakenStream {
            stream,
            role,
            peer_scheme: handshake.peer_scheme(),
        }),
        Err(e) => {
            tracing::debug!(?role, error = %e, "Handshake failed, closing stream");
            let _ = stream.shutdown().await;
            Err(e)
        }
    }
}

async fn exchange<S>(stream: &mut S, handshake: &mut Handshake, read_timeout: Option<Duration>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Some(initial) = handshake.generate_initial()? {
        write_all_flush(stream, &initial).await?;
    }

    while !handshake.is_done() {
        let mut buf = BytesMut::zeroed(handshake.bytes_needed());
        read_exact_within(stream, &mut buf, read_timeout).await?;

        let mut data: Bytes = buf.freeze();
        if let Some(response) = handshake.process(&mut data)? {
            write_all_flush(stream, &response).await?;
        }
    }

    tracing::debug!(
        role = ?handshake.role(),
        peer_scheme = ?handshake.peer_scheme(),
        "Complex handshake complete"
    );
    Ok(())
}
