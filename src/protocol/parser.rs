//! RESP Response Decoder
//!
//! This module decodes server replies from a byte buffer. It never touches
//! the socket itself: the connection appends incoming bytes to a buffer and
//! asks a [`ResponseReader`] to decode one unit from the front of it.
//!
//! ## How the Decoder Works
//!
//! A decode attempt returns either:
//! - `Ok(Some((response, consumed)))` - One complete reply, `consumed` bytes used
//! - `Ok(None)` - The reply is incomplete, read more bytes and retry
//! - `Err(ParseError)` - The stream is no longer framed
//!
//! A `ParseError` is fatal for the stream. There is no resynchronisation in
//! RESP, so the connection that produced the bytes must be torn down.

use crate::protocol::types::{prefix, Response, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while decoding a reply.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer, length or count line
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Multi-bulk count is negative (but not -1 for null)
    #[error("invalid multi-bulk count: {0}")]
    InvalidMultiBulkCount(i64),

    /// Framing violation (missing CRLF, nesting too deep)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The reply exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: i64, max: usize },
}

/// Result type for decoding operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum multi-bulk nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// Decoding strategy used by a connection.
///
/// Implementations inspect `buf` from its first byte and report how many
/// bytes one complete reply occupied. They must not assume `buf` holds a
/// complete reply.
pub trait ResponseReader: Send {
    fn decode(&mut self, buf: &[u8]) -> ParseResult<Option<(Response, usize)>>;
}

/// The standard RESP2 decoder.
///
/// # Example
///
/// ```
/// use flashkv_client::protocol::{RespParser, Response, ResponseReader};
///
/// let mut parser = RespParser::new();
/// let (value, consumed) = parser.decode(b"$6\r\nECHOED\r\n").unwrap().unwrap();
/// assert_eq!(value, Response::bulk("ECHOED"));
/// assert_eq!(consumed, 12);
/// ```
#[derive(Debug, Default, Clone)]
pub struct RespParser {
    /// Current nesting depth (for multi-bulk decoding)
    depth: usize,
}

impl RespParser {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to decode one reply from the front of the buffer.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(Response, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(Response, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        match buf[0] {
            prefix::STATUS => Ok(parse_line(buf)?.map(|(s, n)| (Response::Status(s), n))),
            prefix::ERROR => Ok(parse_line(buf)?.map(|(s, n)| (Response::Error(s), n))),
            prefix::INTEGER => self.parse_integer(buf),
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::MULTI_BULK => self.parse_multi_bulk(buf),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// Parses an integer: `:<integer>\r\n`
    fn parse_integer(&mut self, buf: &[u8]) -> ParseResult<Option<(Response, usize)>> {
        debug_assert!(buf[0] == prefix::INTEGER);

        Ok(parse_number(buf)?.map(|(n, consumed)| (Response::Integer(n), consumed)))
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&mut self, buf: &[u8]) -> ParseResult<Option<(Response, usize)>> {
        debug_assert!(buf[0] == prefix::BULK_STRING);

        let (length, header) = match parse_number(buf)? {
            Some(parsed) => parsed,
            None => return Ok(None),
        };

        if length == -1 {
            return Ok(Some((Response::BulkString(None), header)));
        }

        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        if length > MAX_BULK_SIZE as i64 {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: MAX_BULK_SIZE,
            });
        }
        let length = length as usize;

        let total_needed = header + length + 2;
        if buf.len() < total_needed {
            return Ok(None);
        }

        if &buf[header + length..total_needed] != CRLF {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&buf[header..header + length]);
        Ok(Some((Response::BulkString(Some(data)), total_needed)))
    }

    /// Parses a multi-bulk: `*<count>\r\n<elements...>`
    fn parse_multi_bulk(&mut self, buf: &[u8]) -> ParseResult<Option<(Response, usize)>> {
        debug_assert!(buf[0] == prefix::MULTI_BULK);

        let (count, header) = match parse_number(buf)? {
            Some(parsed) => parsed,
            None => return Ok(None),
        };

        if count == -1 {
            return Ok(Some((Response::MultiBulk(None), header)));
        }

        if count < 0 {
            return Err(ParseError::InvalidMultiBulkCount(count));
        }

        let count = count as usize;
        // The count comes off the wire, so don't trust it for preallocation.
        let mut elements = Vec::with_capacity(count.min(1024));
        let mut consumed = header;

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..])? {
                Some((value, element_consumed)) => {
                    elements.push(value);
                    consumed += element_consumed;
                }
                None => {
                    self.depth -= 1;
                    return Ok(None);
                }
            }
        }
        self.depth -= 1;

        Ok(Some((Response::MultiBulk(Some(elements)), consumed)))
    }
}

impl ResponseReader for RespParser {
    fn decode(&mut self, buf: &[u8]) -> ParseResult<Option<(Response, usize)>> {
        self.parse(buf)
    }
}

/// Reads the text after the prefix byte up to CRLF. Bytes that are not
/// valid UTF-8 become U+FFFD; the line is still well framed.
fn parse_line(buf: &[u8]) -> ParseResult<Option<(String, usize)>> {
    match find_crlf(&buf[1..]) {
        Some(pos) => {
            let s = String::from_utf8_lossy(&buf[1..1 + pos]).into_owned();
            // +1 for prefix, +2 for CRLF
            Ok(Some((s, 1 + pos + 2)))
        }
        None => Ok(None),
    }
}

/// Reads a signed integer line after the prefix byte.
fn parse_number(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    match find_crlf(&buf[1..]) {
        Some(pos) => {
            let s = std::str::from_utf8(&buf[1..1 + pos])
                .map_err(|e| ParseError::InvalidInteger(e.to_string()))?;
            let n: i64 = s
                .parse()
                .map_err(|_| ParseError::InvalidInteger(s.to_string()))?;
            Ok(Some((n, 1 + pos + 2)))
        }
        None => Ok(None),
    }
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Decodes a single reply from bytes with a fresh parser.
pub fn parse_response(buf: &[u8]) -> ParseResult<Option<(Response, usize)>> {
    RespParser::new().parse(buf)
}
