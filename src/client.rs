//! Client-side dial entry point.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use url::Url;

use crate::connection::{Conn, Role};
use crate::error::{Error, HandshakeError, Result};
use crate::protocol::handshake::{compute_accept_key, generate_key, read_head, ResponseHead};
use crate::tls::MaybeTlsStream;

/// Client settings for establishing a WebSocket connection.
///
/// ## Example
///
/// ```rust,ignore
/// let dialer = Dialer {
///     handshake_timeout: Some(Duration::from_secs(10)),
///     ..Dialer::default()
/// };
/// let mut conn = dialer.dial("wss://echo.example.com/chat").await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Dialer {
    /// Hard deadline for the entire handshake: TCP connect, TLS, and the
    /// HTTP exchange. No deadline when `None`.
    pub handshake_timeout: Option<Duration>,

    /// TLS configuration for `wss` targets. When `None`, a configuration
    /// trusting the Mozilla root store is used.
    #[cfg(feature = "tls-rustls")]
    pub tls_config: Option<std::sync::Arc<rustls::ClientConfig>>,
}

impl Dialer {
    /// Establish a WebSocket connection to a `ws://` or `wss://` URL.
    ///
    /// The URL scheme picks the transport (`ws` → TCP, `wss` → TCP + TLS)
    /// and the default port (80 / 443). The opening handshake sends a fresh
    /// random `Sec-WebSocket-Key` and verifies the peer's 101 response,
    /// including the echoed `Sec-WebSocket-Accept` value.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] for an unparseable target or a scheme other
    /// than `ws`/`wss`; [`HandshakeError`] when the peer's response is not a
    /// valid upgrade; transport errors verbatim, including `TimedOut` when
    /// the configured deadline expires.
    pub async fn dial(&self, url: &str) -> Result<Conn<MaybeTlsStream<TcpStream>>> {
        match self.handshake_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, self.handshake(url)).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "websocket handshake timed out",
                )
                .into()),
            },
            None => self.handshake(url).await,
        }
    }

    async fn handshake(&self, url: &str) -> Result<Conn<MaybeTlsStream<TcpStream>>> {
        let url = Url::parse(url).map_err(|err| Error::InvalidUrl(err.to_string()))?;
        let secure = match url.scheme() {
            "ws" => false,
            "wss" => true,
            other => {
                return Err(Error::InvalidUrl(format!(
                    "scheme {other:?} is not ws or wss"
                )))
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl("missing host".into()))?
            .to_string();
        let default_port = if secure { 443 } else { 80 };
        let port = url.port().unwrap_or(default_port);

        let tcp = TcpStream::connect((host.as_str(), port)).await?;
        let mut stream = self.wrap(tcp, &host, secure).await?;

        let key = generate_key()?;
        let host_header = if port == default_port {
            host.clone()
        } else {
            format!("{host}:{port}")
        };
        let target = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };
        let request = format!(
            "GET {target} HTTP/1.1\r\n\
             Host: {host_header}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {key}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
        stream.write_all(request.as_bytes()).await?;
        stream.flush().await?;

        let (head, buffered) = read_head(&mut stream).await?;
        let response = ResponseHead::parse(&head)?;
        check_response(&response, &key)?;

        Ok(Conn::with_buffered(stream, Role::Client, buffered))
    }

    #[cfg(feature = "tls-rustls")]
    async fn wrap(
        &self,
        tcp: TcpStream,
        host: &str,
        secure: bool,
    ) -> Result<MaybeTlsStream<TcpStream>> {
        if secure {
            let tls = crate::tls::client_handshake(tcp, host, self.tls_config.clone()).await?;
            Ok(MaybeTlsStream::Rustls(tls))
        } else {
            Ok(MaybeTlsStream::Plain(tcp))
        }
    }

    #[cfg(not(feature = "tls-rustls"))]
    async fn wrap(
        &self,
        tcp: TcpStream,
        _host: &str,
        secure: bool,
    ) -> Result<MaybeTlsStream<TcpStream>> {
        if secure {
            return Err(HandshakeError::new("wss support requires the tls-rustls feature").into());
        }
        Ok(MaybeTlsStream::Plain(tcp))
    }
}

/// Validate the server's 101 response against what was sent.
fn check_response(response: &ResponseHead, key: &str) -> Result<()> {
    if response.status != 101 {
        return Err(HandshakeError::new(format!(
            "bad status code {}, expected 101 switching protocols",
            response.status
        ))
        .into());
    }
    if !response.header_has_token("upgrade", "websocket") {
        return Err(HandshakeError::new("response Upgrade header does not name websocket").into());
    }
    if !response.header_has_token("connection", "upgrade") {
        return Err(HandshakeError::new("response Connection header does not name upgrade").into());
    }
    if response.header("sec-websocket-accept") != Some(compute_accept_key(key).as_str()) {
        return Err(HandshakeError::new("Sec-WebSocket-Accept does not match the sent key").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

    fn response(head: &str) -> ResponseHead {
        ResponseHead::parse(head.as_bytes()).unwrap()
    }

    #[test]
    fn accepts_valid_response() {
        let head = "HTTP/1.1 101 Switching Protocols\r\n\
            Upgrade: WebSocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
            \r\n";
        assert!(check_response(&response(head), KEY).is_ok());
    }

    #[test]
    fn rejects_non_101_status() {
        let head = "HTTP/1.1 200 OK\r\n\r\n";
        assert!(matches!(
            check_response(&response(head), KEY),
            Err(Error::Handshake(_))
        ));
    }

    #[test]
    fn rejects_wrong_accept_value() {
        let head = "HTTP/1.1 101 Switching Protocols\r\n\
            Upgrade: websocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Accept: bm90IHRoZSByaWdodCBrZXk=\r\n\
            \r\n";
        assert!(matches!(
            check_response(&response(head), KEY),
            Err(Error::Handshake(_))
        ));
    }

    #[test]
    fn rejects_missing_upgrade_header() {
        let head = "HTTP/1.1 101 Switching Protocols\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
            \r\n";
        assert!(matches!(
            check_response(&response(head), KEY),
            Err(Error::Handshake(_))
        ));
    }

    #[tokio::test]
    async fn rejects_non_websocket_scheme() {
        let dialer = Dialer::default();
        let err = dialer.dial("http://localhost/").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));

        let err = dialer.dial("not a url at all").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
