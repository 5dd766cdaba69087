//! Opening-handshake primitives shared by the dial and upgrade paths.
//!
//! HTTP/1.1 here is limited to what the upgrade needs: reading a request or
//! response head off the raw stream, a case-insensitive header map, and the
//! accept-key computation of RFC 6455 section 1.3.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::HandshakeError;

/// The GUID appended to the client key before hashing (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Upper bound on the size of a request or response head.
pub(crate) const MAX_HEAD_SIZE: usize = 8 * 1024;

/// Compute the `Sec-WebSocket-Accept` value for a client key.
///
/// ```
/// use wsline::protocol::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Generate a fresh `Sec-WebSocket-Key`: 16 random bytes, base64-encoded.
///
/// # Errors
///
/// Fails only if the operating system RNG is unavailable.
pub fn generate_key() -> std::io::Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
    Ok(BASE64.encode(nonce))
}

/// Whether a header value contains `token` as one of its comma-separated
/// elements, compared case-insensitively.
///
/// RFC 6455 requires tokenized matching for `Connection` and `Upgrade`;
/// `Connection: keep-alive, Upgrade` must be accepted.
#[must_use]
pub(crate) fn header_contains_token(value: &str, token: &str) -> bool {
    value
        .split(',')
        .any(|element| element.trim().eq_ignore_ascii_case(token))
}

/// Read an HTTP head off `io` up to and including the blank line.
///
/// Returns the head bytes and any bytes read past the terminator, which
/// belong to the frame stream and must seed the connection's read buffer.
pub(crate) async fn read_head<T: AsyncRead + Unpin>(
    io: &mut T,
) -> Result<(Vec<u8>, Vec<u8>), crate::error::Error> {
    let mut buf = Vec::with_capacity(512);
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(end) = find_head_end(&buf) {
            let rest = buf.split_off(end);
            return Ok((buf, rest));
        }
        if buf.len() > MAX_HEAD_SIZE {
            return Err(HandshakeError::new("http head exceeds 8 KiB").into());
        }

        let n = io.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed during handshake",
            )
            .into());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Parse header lines into a map keyed by lowercased header name.
fn parse_header_lines<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    headers
}

/// A parsed upgrade request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    /// The HTTP method, uppercased as sent.
    pub method: String,
    /// The request target, e.g. `/chat`.
    pub path: String,
    headers: HashMap<String, String>,
}

impl UpgradeRequest {
    /// Parse an HTTP request head.
    ///
    /// # Errors
    ///
    /// Rejects non-UTF-8 input, a malformed request line, and any HTTP
    /// version other than 1.1.
    pub fn parse(head: &[u8]) -> Result<Self, HandshakeError> {
        let text = std::str::from_utf8(head)
            .map_err(|_| HandshakeError::new("request head is not valid UTF-8"))?;
        let mut lines = text.lines();

        let request_line = lines
            .next()
            .ok_or_else(|| HandshakeError::new("empty request"))?;
        let mut parts = request_line.split_whitespace();
        let (method, path, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(path), Some(version)) => (method, path, version),
            _ => return Err(HandshakeError::new("malformed request line")),
        };
        if version != "HTTP/1.1" {
            return Err(HandshakeError::new(format!(
                "expected HTTP/1.1, got {version}"
            )));
        }

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            headers: parse_header_lines(lines),
        })
    }

    /// Look up a header by name, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether `name` contains `token` in its comma-separated value.
    #[must_use]
    pub fn header_has_token(&self, name: &str, token: &str) -> bool {
        self.header(name)
            .is_some_and(|value| header_contains_token(value, token))
    }

    /// Check the upgrade requirements of RFC 6455 section 4.2.1, returning
    /// the client's `Sec-WebSocket-Key` when the request qualifies.
    ///
    /// [`crate::accept`] calls this internally; it is public for embedders
    /// that read the request head themselves and write their own response.
    ///
    /// # Errors
    ///
    /// Returns a [`HandshakeError`] naming the first failed requirement:
    /// a non-GET method, missing `upgrade`/`websocket` tokens in the
    /// `Connection`/`Upgrade` headers, a version other than 13, or a
    /// missing or blank key.
    pub fn validate(&self) -> Result<&str, HandshakeError> {
        if self.method != "GET" {
            return Err(HandshakeError::new("request to upgrade is not GET"));
        }
        if !self.header_has_token("connection", "upgrade") {
            return Err(HandshakeError::new("upgrade not found in Connection header"));
        }
        if !self.header_has_token("upgrade", "websocket") {
            return Err(HandshakeError::new("websocket not found in Upgrade header"));
        }
        if self.header("sec-websocket-version") != Some("13") {
            return Err(HandshakeError::new(
                "unsupported version for upgrade to websocket",
            ));
        }
        match self.header("sec-websocket-key") {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(HandshakeError::new(
                "Sec-WebSocket-Key header is missing or blank",
            )),
        }
    }
}

/// A parsed response head, as seen by the dialing client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// The HTTP status code.
    pub status: u16,
    headers: HashMap<String, String>,
}

impl ResponseHead {
    /// Parse an HTTP response head.
    ///
    /// # Errors
    ///
    /// Rejects non-UTF-8 input and a malformed status line.
    pub fn parse(head: &[u8]) -> Result<Self, HandshakeError> {
        let text = std::str::from_utf8(head)
            .map_err(|_| HandshakeError::new("response head is not valid UTF-8"))?;
        let mut lines = text.lines();

        let status_line = lines
            .next()
            .ok_or_else(|| HandshakeError::new("empty response"))?;
        let mut parts = status_line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(version), Some(status)) if version.starts_with("HTTP/1.") => {
                let status = status
                    .parse()
                    .map_err(|_| HandshakeError::new("malformed status code"))?;
                Ok(Self {
                    status,
                    headers: parse_header_lines(lines),
                })
            }
            _ => Err(HandshakeError::new("malformed status line")),
        }
    }

    /// Look up a header by name, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether `name` contains `token` in its comma-separated value.
    #[must_use]
    pub fn header_has_token(&self, name: &str, token: &str) -> bool {
        self.header(name)
            .is_some_and(|value| header_contains_token(value, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_key_matches_rfc_sample() {
        // RFC 6455 section 1.3.
        assert_eq!(
            compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn generated_keys_decode_to_sixteen_bytes() {
        let first = generate_key().unwrap();
        let second = generate_key().unwrap();
        assert_eq!(BASE64.decode(&first).unwrap().len(), 16);
        assert_ne!(first, second);
    }

    #[test]
    fn token_matching_is_case_insensitive_and_listed() {
        assert!(header_contains_token("Upgrade", "upgrade"));
        assert!(header_contains_token("keep-alive, Upgrade", "upgrade"));
        assert!(header_contains_token("WebSocket", "websocket"));
        assert!(!header_contains_token("keep-alive", "upgrade"));
        assert!(!header_contains_token("upgraded", "upgrade"));
    }

    #[test]
    fn parses_upgrade_request() {
        let head = b"GET /chat HTTP/1.1\r\n\
            Host: server.example.com\r\n\
            Upgrade: websocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
            Sec-WebSocket-Version: 13\r\n\
            \r\n";
        let req = UpgradeRequest::parse(head).unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/chat");
        assert_eq!(req.header("host"), Some("server.example.com"));
        assert_eq!(req.header("SEC-WEBSOCKET-KEY"), Some("dGhlIHNhbXBsZSBub25jZQ=="));
        assert!(req.header_has_token("connection", "upgrade"));
        assert!(req.header_has_token("upgrade", "websocket"));
    }

    #[test]
    fn rejects_http_10_request() {
        let head = b"GET / HTTP/1.0\r\n\r\n";
        assert!(UpgradeRequest::parse(head).is_err());
    }

    #[test]
    fn rejects_malformed_request_line() {
        assert!(UpgradeRequest::parse(b"GET /\r\n\r\n").is_err());
        assert!(UpgradeRequest::parse(b"\r\n\r\n").is_err());
    }

    #[test]
    fn validate_returns_the_client_key() {
        let head = b"GET /chat HTTP/1.1\r\n\
            Host: server.example.com\r\n\
            Upgrade: websocket\r\n\
            Connection: keep-alive, Upgrade\r\n\
            Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
            Sec-WebSocket-Version: 13\r\n\
            \r\n";
        let req = UpgradeRequest::parse(head).unwrap();
        assert_eq!(req.validate().unwrap(), "dGhlIHNhbXBsZSBub25jZQ==");
    }

    #[test]
    fn validate_rejects_each_failed_requirement() {
        let valid = "GET /chat HTTP/1.1\r\n\
            Host: server.example.com\r\n\
            Upgrade: websocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
            Sec-WebSocket-Version: 13\r\n\
            \r\n";

        let broken = [
            valid.replace("GET /chat", "POST /chat"),
            valid.replace("Connection: Upgrade\r\n", "Connection: keep-alive\r\n"),
            valid.replace("Upgrade: websocket\r\n", ""),
            valid.replace("Sec-WebSocket-Version: 13", "Sec-WebSocket-Version: 8"),
            valid.replace("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==", "Sec-WebSocket-Key:"),
            valid.replace("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n", ""),
        ];
        for head in &broken {
            let req = UpgradeRequest::parse(head.as_bytes()).unwrap();
            assert!(req.validate().is_err(), "head:\n{head}");
        }

        let req = UpgradeRequest::parse(valid.as_bytes()).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn parses_response_head() {
        let head = b"HTTP/1.1 101 Switching Protocols\r\n\
            Upgrade: WebSocket\r\n\
            Connection: Upgrade\r\n\
            Sec-Websocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
            \r\n";
        let resp = ResponseHead::parse(head).unwrap();
        assert_eq!(resp.status, 101);
        // Mixed-capitalization header names are still found.
        assert_eq!(
            resp.header("Sec-WebSocket-Accept"),
            Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=")
        );
    }

    #[test]
    fn parses_non_switching_status() {
        let resp = ResponseHead::parse(b"HTTP/1.1 404 Not Found\r\n\r\n").unwrap();
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn read_head_splits_trailing_bytes() {
        let mut data = b"HTTP/1.1 101 Switching Protocols\r\n\r\n".to_vec();
        data.extend([0x81, 0x01, 0x41]); // a frame right behind the head
        let mut cursor = std::io::Cursor::new(data);
        let (head, rest) = read_head(&mut cursor).await.unwrap();
        assert!(head.ends_with(b"\r\n\r\n"));
        assert_eq!(rest, [0x81, 0x01, 0x41]);
    }

    #[tokio::test]
    async fn read_head_rejects_truncated_stream() {
        let mut cursor = std::io::Cursor::new(b"GET / HTTP/1.1\r\nHost: x\r\n".to_vec());
        let err = read_head(&mut cursor).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }

    #[tokio::test]
    async fn read_head_rejects_oversized_head() {
        let mut data = b"GET / HTTP/1.1\r\n".to_vec();
        data.extend(std::iter::repeat(b'a').take(MAX_HEAD_SIZE + 16));
        let mut cursor = std::io::Cursor::new(data);
        let err = read_head(&mut cursor).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Handshake(_)));
    }
}
