//! Transport Layer
//!
//! The byte stream a connection runs over: a TCP socket or, on Unix
//! platforms, a Unix domain socket. [`Transport`] is what
//! `Connection::resource` hands out, so callers get a safe stream handle
//! instead of a raw descriptor.

use super::parameters::{ConnectionParameters, Scheme};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

/// An open stream to the server.
#[derive(Debug)]
pub enum Transport {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Transport {
    /// Opens the stream described by `params`, without any timeout.
    ///
    /// The caller bounds this with the connect-phase timeout.
    pub(crate) async fn open(params: &ConnectionParameters) -> io::Result<Self> {
        match params.scheme() {
            Scheme::Tcp => {
                let stream = TcpStream::connect((params.host(), params.port())).await?;
                // Requests are written whole and flushed, batching only adds latency.
                stream.set_nodelay(true)?;
                Ok(Transport::Tcp(stream))
            }
            #[cfg(unix)]
            Scheme::Unix => {
                let path = params.path().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "missing socket path")
                })?;
                Ok(Transport::Unix(UnixStream::connect(path).await?))
            }
            #[cfg(not(unix))]
            Scheme::Unix => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not supported on this platform",
            )),
        }
    }

    /// Short description for logs, e.g. `tcp 127.0.0.1:6379`.
    pub fn describe(&self) -> String {
        match self {
            Transport::Tcp(stream) => match stream.peer_addr() {
                Ok(addr) => format!("tcp {}", addr),
                Err(_) => "tcp (unknown peer)".to_string(),
            },
            #[cfg(unix)]
            Transport::Unix(stream) => match stream.peer_addr() {
                Ok(addr) => match addr.as_pathname() {
                    Some(path) => format!("unix {}", path.display()),
                    None => "unix (unnamed)".to_string(),
                },
                Err(_) => "unix (unknown peer)".to_string(),
            },
        }
    }

    pub fn is_tcp(&self) -> bool {
        matches!(self, Transport::Tcp(_))
    }
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            Transport::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            Transport::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            Transport::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            Transport::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
