//! Transparent handshake relay session
//!
//! Sits between a real client and a real server. Every handshake packet
//! is captured, validated, and forwarded verbatim:
//!
//! ```text
//! Client              Relay                Server
//!   |-- C0+C1 ------->|                      |
//!   |                 |== dial =============>|
//!   |                 |-- C0+C1 ------------>|
//!   |                 |<-- S0+S1+S2 ---------|
//!   |<-- S0+S1+S2 ----|                      |
//!   |-- C2 ---------->|                      |
//!   |                 |-- C2 --------------->|
//! ```
//!
//! The server leg is only opened once C1 has been validated, and nothing
//! is forwarded until the bytes that produced it have been validated. On
//! any failure every open leg is shut down.

use std::future::Future;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::error::{HandshakeError, Result};
use crate::protocol::block::HandshakeBlock;
use crate::protocol::constants::HANDSHAKE_SIZE;
use crate::protocol::offset::OffsetScheme;
use crate::relay::state::{RelayState, RelayValidator};
use crate::transport::{read_exact_within, write_all_flush};

/// One client being relayed to a server
pub struct RelaySession<C, S> {
    session_id: u64,
    client: C,
    server: Option<S>,
    validator: RelayValidator,
    read_timeout: Option<Duration>,
}

/// Both legs after a successful relayed handshake
#[derive(Debug)]
pub struct EstablishedRelay<C, S> {
    pub session_id: u64,
    pub client_scheme: OffsetScheme,
    pub server_scheme: OffsetScheme,
    client: C,
    server: S,
}

impl<C, S> EstablishedRelay<C, S> {
    /// Client-facing and server-facing streams, handshake fully consumed
    pub fn into_parts(self) -> (C, S) {
        (self.client, self.server)
    }
}

impl<C, S> RelaySession<C, S>
where
    C: AsyncRead + AsyncWrite + Unpin,
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(session_id: u64, client: C, read_timeout: Option<Duration>) -> Self {
        Self {
            session_id,
            client,
            server: None,
            validator: RelayValidator::new(),
            read_timeout,
        }
    }

    pub fn state(&self) -> RelayState {
        self.validator.state()
    }

    /// Relay the whole handshake
    ///
    /// `connect` opens the server leg. It is called once, after C0+C1 have
    /// been validated; a client that fails validation never causes a dial.
    ///
    /// Consumes the session: on success both streams are returned ready for
    /// the message layer, on failure every open leg is shut down and dropped.
    pub async fn run<F, Fut>(mut self, connect: F) -> Result<EstablishedRelay<C, S>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S>>,
    {
        let outcome = self.exchange(connect).await;
        match (outcome, self.server.take()) {
            (Ok((client_scheme, server_scheme)), Some(server)) => {
                tracing::info!(
                    session_id = self.session_id,
                    ?client_scheme,
                    ?server_scheme,
                    "Relay established"
                );
                Ok(EstablishedRelay {
                    session_id: self.session_id,
                    client_scheme,
                    server_scheme,
                    client: self.client,
                    server,
                })
            }
            (outcome, server) => {
                let e = match outcome {
                    Err(e) => e,
                    Ok(_) => HandshakeError::InvalidState.into(),
                };
                let failed_at = self.validator.state();
                self.validator.fail();
                tracing::warn!(
                    session_id = self.session_id,
                    state = ?failed_at,
                    error = %e,
                    "Relay handshake failed, closing both legs"
                );
                let _ = self.client.shutdown().await;
                if let Some(mut server) = server {
                    let _ = server.shutdown().await;
                }
                Err(e)
            }
        }
    }

    async fn exchange<F, Fut>(&mut self, connect: F) -> Result<(OffsetScheme, OffsetScheme)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S>>,
    {
        // C>>>P: C0+C1
        let c0 = self.read_byte_from_client().await?;
        let c1 = self.read_block_from_client().await?;
        let client = self.validator.accept_client_greeting(c0, &c1)?;
        tracing::debug!(
            session_id = self.session_id,
            scheme = ?client.scheme,
            offset = client.offset,
            "C1 digest accepted, dialing server"
        );
        self.server = Some(connect().await?);

        // P>>>S: C0+C1
        let mut greeting = BytesMut::with_capacity(1 + HANDSHAKE_SIZE);
        greeting.put_u8(c0);
        greeting.put_slice(c1.as_bytes());
        write_all_flush(self.server()?, &greeting).await?;
        self.validator.client_greeting_forwarded()?;

        // P<<<S: S0+S1+S2
        let s0 = self.read_byte_from_server().await?;
        let s1 = self.read_block_from_server().await?;
        let s2 = self.read_block_from_server().await?;
        let server = self.validator.accept_server_response(s0, &s1, &s2)?;
        tracing::debug!(
            session_id = self.session_id,
            scheme = ?server.scheme,
            offset = server.offset,
            "S1 digest and S2 signature accepted"
        );

        // C<<<P: S0+S1+S2
        let mut response = BytesMut::with_capacity(1 + HANDSHAKE_SIZE * 2);
        response.put_u8(s0);
        response.put_slice(s1.as_bytes());
        response.put_slice(s2.as_bytes());
        write_all_flush(&mut self.client, &response).await?;
        self.validator.server_response_forwarded()?;

        // C>>>P: C2
        let c2 = self.read_block_from_client().await?;
        self.validator.accept_client_response(&c2)?;
        tracing::debug!(session_id = self.session_id, "C2 signature accepted");

        // P>>>S: C2
        write_all_flush(self.server()?, c2.as_bytes()).await?;
        self.validator.client_response_forwarded()?;

        Ok((client.scheme, server.scheme))
    }

    fn server(&mut self) -> Result<&mut S> {
        self.server
            .as_mut()
            .ok_or_else(|| HandshakeError::InvalidState.into())
    }

    async fn read_byte_from_client(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        read_exact_within(&mut self.client, &mut byte, self.read_timeout).await?;
        Ok(byte[0])
    }

    async fn read_byte_from_server(&mut self) -> Result<u8> {
        let deadline = self.read_timeout;
        let mut byte = [0u8; 1];
        read_exact_within(self.server()?, &mut byte, deadline).await?;
        Ok(byte[0])
    }

    async fn read_block_from_client(&mut self) -> Result<HandshakeBlock> {
        let mut block = [0u8; HANDSHAKE_SIZE];
        read_exact_within(&mut self.client, &mut block, self.read_timeout).await?;
        Ok(HandshakeBlock::from_bytes(block))
    }

    async fn read_block_from_server(&mut self) -> Result<HandshakeBlock> {
        let deadline = self.read_timeout;
        let mut block = [0u8; HANDSHAKE_SIZE];
        read_exact_within(self.server()?, &mut block, deadline).await?;
        Ok(HandshakeBlock::from_bytes(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, HandshakeError};
    use crate::protocol::constants::RTMP_VERSION;
    use crate::transport::{client_handshake, server_handshake};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::io::{duplex, AsyncReadExt, DuplexStream};

    const DEADLINE: Option<Duration> = Some(Duration::from_secs(5));

    /// Connector handing over an already open server leg
    fn ready<S>(server: S) -> impl FnOnce() -> std::future::Ready<Result<S>> {
        move || std::future::ready(Ok(server))
    }

    /// Client and server pipes plus the relay's ends of each
    fn pipes() -> (DuplexStream, DuplexStream, DuplexStream, DuplexStream) {
        let (client, relay_client) = duplex(16 * 1024);
        let (relay_server, server) = duplex(16 * 1024);
        (client, relay_client, relay_server, server)
    }

    #[tokio::test]
    async fn test_relay_between_real_peers() {
        let (client, relay_client, relay_server, server) = pipes();

        let server = tokio::spawn(server_handshake(server, DEADLINE));
        let relay = tokio::spawn(
            RelaySession::new(7, relay_client, DEADLINE).run(ready(relay_server)),
        );
        let client = client_handshake(client, DEADLINE).await.unwrap();

        let server = server.await.unwrap().unwrap();
        let relay = relay.await.unwrap().unwrap();
        assert_eq!(relay.session_id, 7);
        assert_eq!(relay.client_scheme, OffsetScheme::SchemeA);
        assert_eq!(relay.server_scheme, OffsetScheme::SchemeA);

        // Relay hands back streams positioned right after the handshake
        let (mut relay_client, mut relay_server) = relay.into_parts();
        let mut client = client.into_inner();
        let mut server = server.into_inner();

        client.write_all(b"connect").await.unwrap();
        let mut buf = [0u8; 7];
        relay_client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"connect");

        server.write_all(b"result").await.unwrap();
        let mut buf = [0u8; 6];
        relay_server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"result");
    }

    #[tokio::test]
    async fn test_bytes_forwarded_verbatim() {
        let (mut client, relay_client, relay_server, mut server) = pipes();
        let relay = tokio::spawn(
            RelaySession::new(1, relay_client, DEADLINE).run(ready(relay_server)),
        );

        // Drive the client side by hand so the exact bytes can be compared
        let mut client_hs = crate::protocol::Handshake::new(crate::protocol::HandshakeRole::Client);
        let c0c1 = client_hs.generate_initial().unwrap().unwrap();
        client.write_all(&c0c1).await.unwrap();

        let mut seen_c0c1 = vec![0u8; 1 + HANDSHAKE_SIZE];
        server.read_exact(&mut seen_c0c1).await.unwrap();
        assert_eq!(seen_c0c1, c0c1.to_vec());

        let mut server_hs = crate::protocol::Handshake::new(crate::protocol::HandshakeRole::Server);
        server_hs.generate_initial().unwrap();
        let s0s1s2 = server_hs
            .process(&mut bytes::Bytes::from(seen_c0c1))
            .unwrap()
            .unwrap();
        server.write_all(&s0s1s2).await.unwrap();

        let mut seen_s0s1s2 = vec![0u8; 1 + HANDSHAKE_SIZE * 2];
        client.read_exact(&mut seen_s0s1s2).await.unwrap();
        assert_eq!(seen_s0s1s2, s0s1s2.to_vec());

        let c2 = client_hs
            .process(&mut bytes::Bytes::from(seen_s0s1s2))
            .unwrap()
            .unwrap();
        client.write_all(&c2).await.unwrap();

        let mut seen_c2 = vec![0u8; HANDSHAKE_SIZE];
        server.read_exact(&mut seen_c2).await.unwrap();
        assert_eq!(seen_c2, c2.to_vec());
        assert!(server_hs.process(&mut bytes::Bytes::from(seen_c2)).unwrap().is_none());
        assert!(server_hs.is_done());

        assert!(relay.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_tampered_server_signature_closes_both_legs() {
        let (client, relay_client, relay_server, mut server) = pipes();
        let relay = tokio::spawn(
            RelaySession::new(2, relay_client, DEADLINE).run(ready(relay_server)),
        );

        // Server answers with a correct S1 but an S2 signature that does not verify
        let server_task = tokio::spawn(async move {
            let mut c0c1 = vec![0u8; 1 + HANDSHAKE_SIZE];
            server.read_exact(&mut c0c1).await.unwrap();
            let mut hs = crate::protocol::Handshake::new(crate::protocol::HandshakeRole::Server);
            hs.generate_initial().unwrap();
            let mut reply = hs
                .process(&mut bytes::Bytes::from(c0c1))
                .unwrap()
                .unwrap()
                .to_vec();
            let last = reply.len() - 1;
            reply[last] ^= 0xff;
            server.write_all(&reply).await.unwrap();

            let mut buf = [0u8; 1];
            server.read(&mut buf).await.unwrap()
        });

        let client_task = tokio::spawn(async move {
            let mut client = client;
            let mut hs = crate::protocol::Handshake::new(crate::protocol::HandshakeRole::Client);
            let c0c1 = hs.generate_initial().unwrap().unwrap();
            client.write_all(&c0c1).await.unwrap();

            let mut buf = [0u8; 1];
            client.read(&mut buf).await.unwrap()
        });

        let err = relay.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Handshake(HandshakeError::SignatureMismatch { .. })));

        // Client never received S0, server sees its leg closed
        assert_eq!(client_task.await.unwrap(), 0);
        assert_eq!(server_task.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unsigned_client_rejected_before_dialing_through() {
        let (mut client, relay_client, relay_server, mut server) = pipes();
        let dialed = Arc::new(AtomicBool::new(false));
        let connect = {
            let dialed = Arc::clone(&dialed);
            move || {
                dialed.store(true, Ordering::SeqCst);
                std::future::ready(Ok(relay_server))
            }
        };
        let relay = tokio::spawn(RelaySession::new(3, relay_client, DEADLINE).run(connect));

        let mut greeting = vec![0u8; 1 + HANDSHAKE_SIZE];
        greeting[0] = RTMP_VERSION;
        client.write_all(&greeting).await.unwrap();

        let err = relay.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Handshake(HandshakeError::DigestMismatch { .. })));
        assert!(!dialed.load(Ordering::SeqCst));

        // Server leg saw nothing but the close
        let mut buf = [0u8; 1];
        assert_eq!(server.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_dial_closes_client() {
        let (mut client, relay_client, _relay_server, _server) = pipes();
        let connect = || async { Err::<DuplexStream, _>(Error::Timeout) };
        let relay = tokio::spawn(RelaySession::new(5, relay_client, DEADLINE).run(connect));

        let mut hs = crate::protocol::Handshake::new(crate::protocol::HandshakeRole::Client);
        let c0c1 = hs.generate_initial().unwrap().unwrap();
        client.write_all(&c0c1).await.unwrap();

        assert!(matches!(relay.await.unwrap().unwrap_err(), Error::Timeout));
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_client_hangup() {
        let (client, relay_client, relay_server, _server) = pipes();
        drop(client);

        let err = RelaySession::new(4, relay_client, DEADLINE)
            .run(ready(relay_server))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }
}
