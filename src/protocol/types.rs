//! RESP (Redis Serialization Protocol) Response Types
//!
//! This module defines the typed values a server sends back to the client.
//! Every reply on the wire decodes into exactly one [`Response`].
//!
//! ## Protocol Format
//!
//! Each RESP type starts with a type prefix byte:
//! - `+` Status (simple string)
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Multi-Bulk (array)
//!
//! All types are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Status: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Multi-Bulk: `*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n`
//! Null Bulk String: `$-1\r\n`
//! Null Multi-Bulk: `*-1\r\n`

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const STATUS: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const MULTI_BULK: u8 = b'*';
}

/// A decoded server reply.
///
/// Null bulk strings and null multi-bulks are kept apart because the
/// server uses them for different things (a missing key versus, for
/// example, a timed-out blocking pop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Status reply, e.g. `OK` or `PONG`.
    /// Format: `+<string>\r\n`
    Status(String),

    /// Error reply carrying the server's own message.
    /// Format: `-<error message>\r\n`
    ///
    /// This is ordinary data, not a local failure.
    Error(String),

    /// 64-bit signed integer.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe bulk string, `None` for `$-1\r\n`.
    BulkString(Option<Bytes>),

    /// Ordered, possibly nested sequence, `None` for `*-1\r\n`.
    MultiBulk(Option<Vec<Response>>),
}

impl Response {
    /// Creates a status reply.
    ///
    /// # Example
    /// ```
    /// use flashkv_client::protocol::types::Response;
    /// let ok = Response::status("OK");
    /// assert!(ok.is_status());
    /// ```
    pub fn status(s: impl Into<String>) -> Self {
        Response::Status(s.into())
    }

    /// Creates an error reply.
    pub fn error(s: impl Into<String>) -> Self {
        Response::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        Response::Integer(n)
    }

    /// Creates a non-null bulk string.
    ///
    /// # Example
    /// ```
    /// use flashkv_client::protocol::types::Response;
    /// let bulk = Response::bulk("ECHOED");
    /// assert_eq!(bulk.as_bytes(), Some(&b"ECHOED"[..]));
    /// ```
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Response::BulkString(Some(data.into()))
    }

    pub fn null_bulk() -> Self {
        Response::BulkString(None)
    }

    pub fn multi_bulk(values: Vec<Response>) -> Self {
        Response::MultiBulk(Some(values))
    }

    pub fn null_multi_bulk() -> Self {
        Response::MultiBulk(None)
    }

    /// Serializes the response to its wire format.
    ///
    /// The client never sends responses, but test servers and benches do.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the response into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Response::Status(s) => {
                buf.push(prefix::STATUS);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Response::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Response::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Response::BulkString(Some(data)) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Response::BulkString(None) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Response::MultiBulk(Some(values)) => {
                buf.push(prefix::MULTI_BULK);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
            Response::MultiBulk(None) => {
                buf.push(prefix::MULTI_BULK);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
        }
    }

    /// Returns true for either null sentinel.
    pub fn is_null(&self) -> bool {
        matches!(self, Response::BulkString(None) | Response::MultiBulk(None))
    }

    pub fn is_status(&self) -> bool {
        matches!(self, Response::Status(_))
    }

    /// Returns true if the server replied with an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// The server-supplied message of an error reply.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Response::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Attempts to view a status or UTF-8 bulk string as `&str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Response::Status(s) => Some(s),
            Response::BulkString(Some(b)) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Attempts to extract the payload of a non-null bulk string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Response::BulkString(Some(b)) => Some(b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Response::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to view the elements of a non-null multi-bulk.
    pub fn as_array(&self) -> Option<&[Response]> {
        match self {
            Response::MultiBulk(Some(arr)) => Some(arr),
            _ => None,
        }
    }

    /// Consumes self and returns the elements of a non-null multi-bulk.
    pub fn into_array(self) -> Option<Vec<Response>> {
        match self {
            Response::MultiBulk(Some(arr)) => Some(arr),
            _ => None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Status(s) => write!(f, "{}", s),
            Response::Error(s) => write!(f, "(error) {}", s),
            Response::Integer(n) => write!(f, "(integer) {}", n),
            Response::BulkString(Some(data)) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "\"{}\"", s)
                } else {
                    write!(f, "(binary data, {} bytes)", data.len())
                }
            }
            Response::BulkString(None) | Response::MultiBulk(None) => write!(f, "(nil)"),
            Response::MultiBulk(Some(values)) => {
                if values.is_empty() {
                    write!(f, "(empty array)")
                } else {
                    writeln!(f)?;
                    for (i, v) in values.iter().enumerate() {
                        writeln!(f, "{}) {}", i + 1, v)?;
                    }
                    Ok(())
                }
            }
        }
    }
}
