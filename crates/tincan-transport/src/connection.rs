//! The server connection.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, trace};

use tincan_core::codec::format;
use tincan_core::{FrameReader, Message};

use crate::error::{TransportError, TransportResult};

/// Tracing target of the raw line log.
pub const WIRE_TARGET: &str = "tincan::wire";

/// Handshake timeout used when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const READ_BUFFER_SIZE: usize = 4096;

/// One connection to a server.
///
/// Owns the stream and the inbound [`FrameReader`]. Every raw line that goes
/// over the wire is logged at `DEBUG` under [`WIRE_TARGET`] with a
/// `direction` field of `send` or `recv`.
pub struct Connection<S = TcpStream> {
    stream: Option<S>,
    reader: FrameReader,
    buffer: Box<[u8]>,
    peer: String,
}

impl Connection<TcpStream> {
    /// Opens a TCP connection to `host:port`.
    ///
    /// # Errors
    ///
    /// [`TransportError::Timeout`] if the handshake takes longer than
    /// `timeout`, [`TransportError::ConnectionFailed`] if it fails.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> TransportResult<Self> {
        let addr = format!("{host}:{port}");
        info!(addr = %addr, "Connecting to server");

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::Timeout {
                addr: addr.clone(),
                timeout,
            })?
            .map_err(|e| TransportError::ConnectionFailed {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;

        info!(addr = %addr, "Connected to server");
        Ok(Self::from_stream(stream, addr))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already established stream.
    pub fn from_stream(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream: Some(stream),
            reader: FrameReader::new(),
            buffer: vec![0; READ_BUFFER_SIZE].into_boxed_slice(),
            peer: peer.into(),
        }
    }

    /// Returns the peer description given at construction.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Returns true until [`shutdown`](Self::shutdown) is called.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Writes one line followed by CR LF.
    ///
    /// The line is validated before anything is written.
    ///
    /// # Errors
    ///
    /// [`TransportError::Protocol`] if the line is too long or contains a line
    /// break, [`TransportError::ConnectionClosed`] after shutdown, or
    /// [`TransportError::Io`] if the write fails.
    pub async fn send(&mut self, line: &str) -> TransportResult<()> {
        format::check_line(line)?;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::closed("send after shutdown"))?;

        debug!(target: WIRE_TARGET, direction = "send", line = %line);

        let mut data = Vec::with_capacity(line.len() + 2);
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(b"\r\n");
        stream.write_all(&data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Performs one read and returns every message it completes.
    ///
    /// May return an empty batch when the read ended mid-line. Empty lines are
    /// skipped. The only await point is the read itself, so dropping the
    /// future before it completes loses no data.
    ///
    /// # Errors
    ///
    /// [`TransportError::Protocol`] when the peer closed the stream or a line
    /// does not parse, [`TransportError::Io`] if the read fails.
    pub async fn receive(&mut self) -> TransportResult<Vec<Message>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::closed("receive after shutdown"))?;

        let n = stream.read(&mut self.buffer).await?;
        let lines = self.reader.feed(&self.buffer[..n])?;

        let mut messages = Vec::with_capacity(lines.len());
        for line in lines {
            debug!(target: WIRE_TARGET, direction = "recv", line = %line);
            if line.is_empty() {
                trace!("Skipping empty line");
                continue;
            }
            messages.push(Message::parse(&line)?);
        }
        Ok(messages)
    }

    /// Closes the write half and drops the stream.
    ///
    /// Calling this on an already closed connection does nothing.
    ///
    /// # Errors
    ///
    /// [`TransportError::Io`] if the half-close fails; the stream is dropped
    /// either way.
    pub async fn shutdown(&mut self) -> TransportResult<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        info!(peer = %self.peer, "Closing connection");
        stream.shutdown().await?;
        Ok(())
    }
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("open", &self.stream.is_some())
            .field("pending", &self.reader.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tincan_core::{MAX_LINE_LEN, ProtocolError};
    use tokio::net::TcpListener;
    use tokio_test::io::{Builder, Mock};

    fn mock_connection(mock: Mock) -> Connection<Mock> {
        Connection::from_stream(mock, "mock")
    }

    #[tokio::test]
    async fn test_send_appends_terminator() {
        let mock = Builder::new().write(b"NICK tincan\r\n").build();
        let mut conn = mock_connection(mock);
        conn.send("NICK tincan").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_rejects_oversized_line_without_io() {
        let mut conn = mock_connection(Builder::new().build());
        let err = conn.send(&"a".repeat(MAX_LINE_LEN + 1)).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(ProtocolError::MessageTooLong { .. })
        ));

        let err = conn.send("PRIVMSG #chan :a\nQUIT").await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(ProtocolError::EmbeddedLineBreak)
        ));
    }

    #[tokio::test]
    async fn test_receive_reassembles_fragments() {
        let mock = Builder::new()
            .read(b":irc.example.org 00")
            .read(b"1 tincan :Welcome\r\nPING :irc.exa")
            .read(b"mple.org\r\n")
            .build();
        let mut conn = mock_connection(mock);

        assert!(conn.receive().await.unwrap().is_empty());

        let batch = conn.receive().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].command(), "001");
        assert_eq!(batch[0].param(0), Some("tincan"));

        let batch = conn.receive().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].command(), "PING");
        assert_eq!(batch[0].trailing(), Some("irc.example.org"));
    }

    #[tokio::test]
    async fn test_receive_batches_and_skips_empty_lines() {
        let mock = Builder::new().read(b"PING :a\r\n\r\nPING :b\r\n").build();
        let mut conn = mock_connection(mock);

        let batch = conn.receive().await.unwrap();
        let tokens: Vec<_> = batch.iter().map(|m| m.trailing().unwrap()).collect();
        assert_eq!(tokens, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_receive_eof_is_connection_reset() {
        let mut conn = mock_connection(Builder::new().build());
        let err = conn.receive().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(ProtocolError::ConnectionReset)
        ));
    }

    #[tokio::test]
    async fn test_receive_malformed_prefix() {
        let mock = Builder::new().read(b":no-space-here\r\n").build();
        let mut conn = mock_connection(mock);
        let err = conn.receive().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(ProtocolError::MalformedPrefix { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_twice_is_noop() {
        let mut conn = mock_connection(Builder::new().build());
        assert!(conn.is_open());

        conn.shutdown().await.unwrap();
        assert!(!conn.is_open());
        conn.shutdown().await.unwrap();
        assert!(!conn.is_open());

        assert!(matches!(
            conn.send("QUIT").await,
            Err(TransportError::ConnectionClosed { .. })
        ));
        assert!(matches!(
            conn.receive().await,
            Err(TransportError::ConnectionClosed { .. })
        ));
    }

    #[tokio::test]
    async fn test_connect_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"PING :hello\r\n").await.unwrap();
            let mut buf = vec![0; 64];
            let n = socket.read(&mut buf).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        let mut conn = Connection::connect("127.0.0.1", port, DEFAULT_CONNECT_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(conn.peer(), format!("127.0.0.1:{port}"));

        let batch = conn.receive().await.unwrap();
        assert_eq!(batch[0].command(), "PING");
        conn.send("PONG tincan").await.unwrap();
        conn.shutdown().await.unwrap();

        assert_eq!(server.await.unwrap(), "PONG tincan\r\n");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Connection::connect("127.0.0.1", port, DEFAULT_CONNECT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    }
}
