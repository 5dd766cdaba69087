//! TLS plumbing for `wss://` targets.
//!
//! The dialer produces a [`MaybeTlsStream`] so plaintext and TLS connections
//! share one concrete connection type. Server-side TLS is the embedder's
//! concern: terminate TLS however you like (e.g. `tokio_rustls::TlsAcceptor`)
//! and hand the resulting stream to [`crate::accept`], which is generic over
//! the transport.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[cfg(feature = "tls-rustls")]
use std::sync::Arc;

#[cfg(feature = "tls-rustls")]
use rustls::pki_types::ServerName;
#[cfg(feature = "tls-rustls")]
use rustls::ClientConfig;
#[cfg(feature = "tls-rustls")]
use tokio_rustls::TlsConnector;

#[cfg(feature = "tls-rustls")]
use crate::error::{Error, HandshakeError, Result};

/// A stream that is either plaintext or TLS on the client side.
#[derive(Debug)]
pub enum MaybeTlsStream<S> {
    /// Plaintext transport.
    Plain(S),
    /// TLS transport negotiated during dial.
    #[cfg(feature = "tls-rustls")]
    Rustls(tokio_rustls::client::TlsStream<S>),
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncRead for MaybeTlsStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncWrite for MaybeTlsStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Run the client TLS handshake over an established transport.
#[cfg(feature = "tls-rustls")]
pub(crate) async fn client_handshake<S>(
    stream: S,
    host: &str,
    config: Option<Arc<ClientConfig>>,
) -> Result<tokio_rustls::client::TlsStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let config = config.unwrap_or_else(default_client_config);
    let connector = TlsConnector::from(config);
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::Handshake(HandshakeError::new(format!("invalid server name {host:?}"))))?;
    Ok(connector.connect(server_name, stream).await?)
}

/// Client configuration trusting the Mozilla root store.
#[cfg(feature = "tls-rustls")]
fn default_client_config() -> Arc<ClientConfig> {
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn plain_stream_delegates_io() {
        let (mut peer, io) = duplex(64);
        let mut stream = MaybeTlsStream::Plain(io);

        stream.write_all(b"ping").await.unwrap();
        stream.flush().await.unwrap();
        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        peer.write_all(b"pong").await.unwrap();
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[cfg(feature = "tls-rustls")]
    #[tokio::test]
    async fn rejects_unparseable_server_name() {
        let (_peer, io) = duplex(64);
        let result = client_handshake(io, "bad name with spaces", None).await;
        assert!(matches!(result, Err(Error::Handshake(_))));
    }
}
