//! TCP client for the dump1090 BaseStation output (port 30003).

use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

const LINE_END: &[u8] = b"\r\n";
const READ_CHUNK: usize = 1024;
/// Longest partial line kept while waiting for its terminator
const MAX_LINE: usize = 4096;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Socket error: {0}")]
    Io(#[from] io::Error),
    #[error("Feed closed the connection")]
    Closed,
    #[error("Not connected")]
    NotConnected,
}

/// Configuration for the feed connection.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub host: String,
    pub port: u16,
    /// Longest a single receive waits for data
    pub read_timeout: Duration,
    /// Pause between connection attempts
    pub reconnect_delay: Duration,
}

impl FeedConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            read_timeout: Duration::from_secs(1),
            reconnect_delay: Duration::from_secs(1),
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 30003)
    }
}

/// Line oriented reader for the feed.
pub struct FeedClient {
    config: FeedConfig,
    stream: Option<TcpStream>,
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a line end
    scanned: usize,
}

impl FeedClient {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            stream: None,
            buffer: Vec::with_capacity(MAX_LINE + READ_CHUNK),
            scanned: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connect, retrying until it succeeds.
    pub async fn connect(&mut self) {
        tracing::info!(
            "Connecting to dump1090 TCP on {}:{}",
            self.config.host,
            self.config.port
        );

        loop {
            match TcpStream::connect((self.config.host.as_str(), self.config.port)).await {
                Ok(stream) => {
                    tracing::info!("Connected OK, receiving data");
                    self.stream = Some(stream);
                    self.clear_buffer();
                    return;
                }
                Err(e) => {
                    tracing::warn!("Could not connect ({}), retrying", e);
                    sleep(self.config.reconnect_delay).await;
                }
            }
        }
    }

    /// Next complete line, or `None` if none arrived within the read timeout.
    pub async fn receive(&mut self) -> Result<Option<String>, FeedError> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let stream = self.stream.as_mut().ok_or(FeedError::NotConnected)?;
        let mut chunk = [0u8; READ_CHUNK];

        let n = match timeout(self.config.read_timeout, stream.read(&mut chunk)).await {
            Ok(read) => read?,
            Err(_) => return Ok(None),
        };
        if n == 0 {
            return Err(FeedError::Closed);
        }
        self.buffer.extend_from_slice(&chunk[..n]);

        // Acknowledge every read, as the receiver expects. A peer that stops
        // reading must not stall the loop past the read timeout.
        match timeout(self.config.read_timeout, stream.write_all(LINE_END)).await {
            Ok(written) => written?,
            Err(_) => tracing::debug!("Feed acknowledgement timed out"),
        }

        Ok(self.take_line())
    }

    /// Close the connection and drop any partial line.
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!("Feed shutdown error: {}", e);
            }
            tracing::info!("Disconnected from dump1090");
        }
        self.clear_buffer();
    }

    fn clear_buffer(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    /// Split off the first complete line. Only bytes appended since the last
    /// call are searched; an unterminated run longer than `MAX_LINE` is dropped.
    fn take_line(&mut self) -> Option<String> {
        // A `\r` at the old end may pair with a `\n` that just arrived
        let start = self.scanned.saturating_sub(LINE_END.len() - 1);
        let found = self.buffer[start..]
            .windows(LINE_END.len())
            .position(|w| w == LINE_END);

        let Some(pos) = found else {
            self.scanned = self.buffer.len();
            self.drop_overlong();
            return None;
        };

        let end = start + pos;
        let line = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
        self.buffer.drain(..end + LINE_END.len());
        self.scanned = 0;
        Some(line)
    }

    fn drop_overlong(&mut self) {
        if self.buffer.len() <= MAX_LINE {
            return;
        }

        // Keep a trailing `\r` so a terminator split across reads still ends a line
        let keep_cr = self.buffer.last() == Some(&b'\r');
        tracing::warn!(
            "Dropping {} bytes from the feed without a line end",
            self.buffer.len() - usize::from(keep_cr)
        );
        self.buffer.clear();
        if keep_cr {
            self.buffer.push(b'\r');
        }
        self.scanned = self.buffer.len();
    }
}
