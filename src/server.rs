//! Server-side upgrade entry point.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::connection::{Conn, Role};
use crate::error::{Error, HandshakeError, Result};
use crate::protocol::handshake::{compute_accept_key, read_head, UpgradeRequest};

const SERVER_HEADER: &str = concat!("wsline/", env!("CARGO_PKG_VERSION"));

/// Upgrade an inbound HTTP connection to WebSocket.
///
/// Reads the request head off the raw stream, validates the upgrade per
/// RFC 6455 (tokenized, case-insensitive `Connection` and `Upgrade`
/// matching), and writes the `101 Switching Protocols` response. On a
/// rejected request an HTTP error response (405 for a non-GET method, 400
/// otherwise) goes out before the [`HandshakeError`] surfaces.
///
/// The stream is typically a freshly accepted `TcpStream`, or the output of
/// a TLS acceptor for `wss` endpoints.
///
/// ## Example
///
/// ```rust,ignore
/// let listener = TcpListener::bind("127.0.0.1:9001").await?;
/// loop {
///     let (stream, _) = listener.accept().await?;
///     let mut conn = wsline::accept(stream).await?;
///     let (kind, payload) = conn.read_message().await?;
///     conn.write_message(kind, &payload).await?;
/// }
/// ```
///
/// # Errors
///
/// Transport errors verbatim; [`HandshakeError`] for an invalid upgrade
/// request.
pub async fn accept<T>(mut stream: T) -> Result<Conn<T>>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let (head, buffered) = read_head(&mut stream).await?;

    let request = match UpgradeRequest::parse(&head) {
        Ok(request) => request,
        Err(err) => return Err(reject(&mut stream, 400, err).await),
    };
    let key = match request.validate() {
        Ok(key) => key.to_string(),
        Err(err) => {
            let status = if request.method == "GET" { 400 } else { 405 };
            return Err(reject(&mut stream, status, err).await);
        }
    };

    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Server: {SERVER_HEADER}\r\n\
         Upgrade: WebSocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        compute_accept_key(&key)
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;

    Ok(Conn::with_buffered(stream, Role::Server, buffered))
}

/// Best-effort HTTP error response; the handshake error surfaces regardless.
async fn reject<T>(stream: &mut T, status: u16, err: HandshakeError) -> Error
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let phrase = match status {
        405 => "Method Not Allowed",
        _ => "Bad Request",
    };
    let body = format!("{}\n", err.reason);
    let response = format!(
        "HTTP/1.1 {status} {phrase}\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
    Error::Handshake(err)
}
