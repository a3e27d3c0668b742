//! Single-Connection Client
//!
//! [`Connection`] owns one stream to the server and drives the request /
//! response cycle over it.
//!
//! ## Connection Lifecycle
//!
//! ```text
//!            new()
//!              │
//!              ▼
//!     ┌─────────────────┐   connect() / first use   ┌─────────────────┐
//!     │  Disconnected   │ ────────────────────────> │    Connected    │
//!     │                 │ <──────────────────────── │                 │
//!     └─────────────────┘   disconnect() / fatal    └────────┬────────┘
//!                                                            │
//!                              on every successful connect:  │
//!                              replay queued connect-commands┘
//! ```
//!
//! ## Buffer Management
//!
//! Replies are read into a `BytesMut` buffer and handed to the
//! [`ResponseReader`] until it reports a complete reply. Bytes beyond that
//! reply stay buffered for the next read, which is what makes pipelining
//! work: several replies may arrive in a single TCP segment.

use crate::commands::Command;
use crate::connection::parameters::ConnectionParameters;
use crate::connection::transport::Transport;
use crate::protocol::{encode_command, ParseError, RespParser, Response, ResponseReader};
use bytes::{Buf, BytesMut};
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, trace, warn};

/// Initial read buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Counters for one or more connections.
///
/// A `ConnectionStats` can be shared between connections through an `Arc`
/// to aggregate their traffic.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Successful connects
    pub connections_opened: AtomicU64,
    /// Requests written
    pub commands_written: AtomicU64,
    /// Replies decoded
    pub responses_read: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_written(&self, bytes: usize) {
        self.commands_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn response_read(&self) {
        self.responses_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Broad classes of [`ConnectionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller used the connection out of order. Nothing was sent.
    Usage,
    /// The transport failed. The connection has been torn down.
    Connection,
    /// The server sent unframed bytes. The connection has been torn down.
    Protocol,
}

/// Errors raised by [`Connection`].
///
/// Error replies from the server are not errors here; they decode to
/// [`Response::Error`].
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection already established.")]
    AlreadyConnected,

    #[error("Connection not established.")]
    NotConnected,

    #[error("Cannot connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Connection to {address} timed out after {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed by server")]
    Closed,

    #[error("Connect command {command} rejected: {message}")]
    InitCommandRejected { command: String, message: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ParseError),
}

impl ConnectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::AlreadyConnected | ConnectionError::NotConnected => ErrorKind::Usage,
            ConnectionError::Protocol(_) => ErrorKind::Protocol,
            _ => ErrorKind::Connection,
        }
    }

    /// True when the connection can no longer be used as is.
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::Usage
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ConnectionError::Timeout { .. } | ConnectionError::ConnectTimeout { .. }
        )
    }
}

/// A single connection to a RESP server.
///
/// The connection is strictly sequential: every method takes `&mut self`,
/// and replies must be read in the order requests were written.
///
/// # Example
///
/// ```ignore
/// use flashkv_client::commands::Command;
/// use flashkv_client::connection::{Connection, ConnectionParameters};
///
/// let params = ConnectionParameters::tcp("127.0.0.1", 6379)?;
/// let mut conn = Connection::new(params);
///
/// let reply = conn.execute_command(&Command::with_args("echo", ["ECHOED"])).await?;
/// assert_eq!(reply.as_bytes(), Some(&b"ECHOED"[..]));
/// ```
pub struct Connection<R = RespParser> {
    /// Where to connect
    params: ConnectionParameters,

    /// The open stream, present exactly while connected
    stream: Option<BufWriter<Transport>>,

    /// Bytes read but not yet decoded
    buffer: BytesMut,

    /// Scratch space for encoding requests
    write_buf: BytesMut,

    /// Reply decoder
    reader: R,

    /// Replayed in order on every successful connect
    init_commands: Vec<Command>,

    stats: Arc<ConnectionStats>,
}

impl Connection<RespParser> {
    /// Creates a disconnected connection using the standard decoder.
    pub fn new(params: ConnectionParameters) -> Self {
        Self::with_reader(params, RespParser::new())
    }
}

impl<R: ResponseReader> Connection<R> {
    /// Creates a disconnected connection with a custom reply decoder.
    pub fn with_reader(params: ConnectionParameters, reader: R) -> Self {
        Self {
            params,
            stream: None,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            write_buf: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            reader,
            init_commands: Vec::new(),
            stats: Arc::new(ConnectionStats::new()),
        }
    }

    /// Replaces the statistics sink, e.g. with one shared by several connections.
    pub fn with_stats(mut self, stats: Arc<ConnectionStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn parameters(&self) -> &ConnectionParameters {
        &self.params
    }

    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Queues a command to run on every future connect.
    ///
    /// Has no effect on a connection that is already established.
    pub fn add_connect_command(&mut self, command: Command) {
        self.init_commands.push(command);
    }

    pub fn connect_commands(&self) -> &[Command] {
        &self.init_commands
    }

    /// Opens the transport and runs the queued connect-commands.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        if self.is_connected() {
            return Err(ConnectionError::AlreadyConnected);
        }

        let address = self.params.address();
        let limit = self.params.timeout();
        let transport = match bounded(Some(limit), Transport::open(&self.params)).await {
            Some(Ok(transport)) => transport,
            Some(Err(source)) => {
                debug!(address = %address, error = %source, "Connect failed");
                return Err(ConnectionError::Connect { address, source });
            }
            None => {
                debug!(address = %address, timeout = ?limit, "Connect timed out");
                return Err(ConnectionError::ConnectTimeout {
                    address,
                    timeout: limit,
                });
            }
        };

        debug!(address = %address, peer = %transport.describe(), "Connected");
        self.stream = Some(BufWriter::new(transport));
        self.buffer.clear();
        self.stats.connection_opened();

        for index in 0..self.init_commands.len() {
            let command = self.init_commands[index].clone();
            self.send(&command).await?;
            let response = self.receive(&command).await?;
            if let Response::Error(message) = response {
                warn!(address = %address, command = %command.verb(), error = %message, "Connect command rejected");
                self.disconnect();
                return Err(ConnectionError::InitCommandRejected {
                    command: command.verb().to_uppercase(),
                    message,
                });
            }
        }

        Ok(())
    }

    /// Closes the transport. Does nothing when already disconnected.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!(address = %self.params.address(), "Disconnected");
            drop(stream);
        }
        self.buffer.clear();
    }

    /// Returns the underlying stream, connecting first if necessary.
    pub async fn resource(&mut self) -> Result<&mut Transport, ConnectionError> {
        self.ensure_connected().await?;
        self.stream
            .as_mut()
            .map(BufWriter::get_mut)
            .ok_or(ConnectionError::NotConnected)
    }

    /// Encodes and sends `command` without waiting for its reply.
    pub async fn write_request(&mut self, command: &Command) -> Result<(), ConnectionError> {
        self.ensure_connected().await?;
        self.send(command).await
    }

    /// Reads the reply belonging to `command`.
    ///
    /// The command only labels the read in logs; decoding depends solely
    /// on the bytes received.
    pub async fn read_response(&mut self, command: &Command) -> Result<Response, ConnectionError> {
        self.receive(command).await
    }

    /// Reads the next reply, whatever request it belongs to.
    pub async fn read(&mut self) -> Result<Response, ConnectionError> {
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }
        let result = self.read_next().await;
        self.check(result)
    }

    /// Writes `command` and reads its reply.
    pub async fn execute_command(&mut self, command: &Command) -> Result<Response, ConnectionError> {
        self.write_request(command).await?;
        self.read_response(command).await
    }

    async fn ensure_connected(&mut self) -> Result<(), ConnectionError> {
        if !self.is_connected() {
            self.connect().await?;
        }
        Ok(())
    }

    async fn send(&mut self, command: &Command) -> Result<(), ConnectionError> {
        let limit = self.params.read_write_timeout();
        let Self {
            stream, write_buf, ..
        } = self;
        let stream = stream.as_mut().ok_or(ConnectionError::NotConnected)?;

        write_buf.clear();
        encode_command(command, write_buf);
        let result = write_request_to(stream, write_buf, limit).await;

        if result.is_ok() {
            self.stats.command_written(self.write_buf.len());
            trace!(command = %command.verb(), bytes = self.write_buf.len(), "Sent request");
        }
        self.check(result)
    }

    async fn receive(&mut self, command: &Command) -> Result<Response, ConnectionError> {
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }
        let result = self.read_next().await;
        if let Ok(response) = &result {
            trace!(command = %command.verb(), error = response.is_error(), "Read response");
        }
        self.check(result)
    }

    async fn read_next(&mut self) -> Result<Response, ConnectionError> {
        let limit = self.params.read_write_timeout();
        let Self {
            stream,
            buffer,
            reader,
            stats,
            ..
        } = self;
        let stream = stream.as_mut().ok_or(ConnectionError::NotConnected)?;

        let (response, read) = read_response_from(stream.get_mut(), buffer, reader, limit).await?;
        stats.bytes_read(read);
        stats.response_read();
        Ok(response)
    }

    /// Tears the connection down after a fatal error.
    fn check<T>(&mut self, result: Result<T, ConnectionError>) -> Result<T, ConnectionError> {
        if let Err(err) = &result {
            if err.is_fatal() && self.is_connected() {
                warn!(address = %self.params.address(), error = %err, "Connection error, closing");
                self.disconnect();
            }
        }
        result
    }
}

impl<R> std::fmt::Debug for Connection<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("params", &self.params)
            .field("connected", &self.stream.is_some())
            .field("buffered", &self.buffer.len())
            .field("init_commands", &self.init_commands.len())
            .finish()
    }
}

/// Runs `fut` under an optional deadline. `None` means it timed out.
///
/// A zero limit is treated as no limit.
async fn bounded<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit.filter(|d| !d.is_zero()) {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Writes an encoded request in full and flushes it.
pub(crate) async fn write_request_to<S>(
    stream: &mut S,
    request: &[u8],
    limit: Option<Duration>,
) -> Result<(), ConnectionError>
where
    S: AsyncWrite + Unpin,
{
    match bounded(limit, write_and_flush(stream, request)).await {
        Some(result) => Ok(result?),
        None => Err(ConnectionError::Timeout {
            operation: "write",
            timeout: limit.unwrap_or_default(),
        }),
    }
}

/// Reads from `stream` into `buffer` until `reader` yields one reply.
///
/// Returns the reply and the number of bytes pulled off the stream. Any
/// bytes past the reply are left in `buffer`. The deadline applies to the
/// whole reply, not to each individual read.
pub(crate) async fn read_response_from<S, R>(
    stream: &mut S,
    buffer: &mut BytesMut,
    reader: &mut R,
    limit: Option<Duration>,
) -> Result<(Response, usize), ConnectionError>
where
    S: AsyncRead + Unpin,
    R: ResponseReader + ?Sized,
{
    match bounded(limit, fill_until_decoded(stream, buffer, reader)).await {
        Some(result) => result,
        None => Err(ConnectionError::Timeout {
            operation: "read",
            timeout: limit.unwrap_or_default(),
        }),
    }
}

async fn write_and_flush<S>(stream: &mut S, request: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(request).await?;
    stream.flush().await
}

async fn fill_until_decoded<S, R>(
    stream: &mut S,
    buffer: &mut BytesMut,
    reader: &mut R,
) -> Result<(Response, usize), ConnectionError>
where
    S: AsyncRead + Unpin,
    R: ResponseReader + ?Sized,
{
    let mut total = 0;
    loop {
        if let Some((response, consumed)) = reader.decode(buffer)? {
            buffer.advance(consumed);
            return Ok((response, total));
        }

        if buffer.capacity() - buffer.len() < 1024 {
            buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = stream.read_buf(buffer).await?;
        if n == 0 {
            return Err(ConnectionError::Closed);
        }
        total += n;
    }
}
