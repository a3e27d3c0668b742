//! Request Encoding
//!
//! Every request goes out as a RESP array of bulk strings:
//!
//! ```text
//! *<argc>\r\n
//! $<len(verb)>\r\n<verb>\r\n
//! $<len(arg1)>\r\n<arg1>\r\n
//! ...
//! ```
//!
//! Lengths are byte lengths, so arguments may hold arbitrary binary data
//! including CR and LF. Nothing is escaped.

use crate::commands::Command;
use crate::protocol::types::{prefix, CRLF};
use bytes::{BufMut, BytesMut};

/// Appends the wire form of `command` to `buf`.
pub fn encode_command(command: &Command, buf: &mut BytesMut) {
    buf.reserve(encoded_len(command));

    buf.put_u8(prefix::MULTI_BULK);
    buf.put_slice(command.wire_len().to_string().as_bytes());
    buf.put_slice(CRLF);

    put_bulk(buf, command.verb().as_bytes());
    for arg in command.arguments() {
        put_bulk(buf, arg);
    }
}

/// Returns the wire form of `command` as a fresh buffer.
///
/// # Example
/// ```
/// use flashkv_client::commands::Command;
/// use flashkv_client::protocol::codec::to_bytes;
///
/// let cmd = Command::with_args("echo", ["ECHOED"]);
/// assert_eq!(&to_bytes(&cmd)[..], b"*2\r\n$4\r\necho\r\n$6\r\nECHOED\r\n");
/// ```
pub fn to_bytes(command: &Command) -> BytesMut {
    let mut buf = BytesMut::new();
    encode_command(command, &mut buf);
    buf
}

/// Exact number of bytes [`encode_command`] will append.
pub fn encoded_len(command: &Command) -> usize {
    let header = 1 + digits(command.wire_len()) + 2;
    let verb = bulk_len(command.verb().len());
    let args: usize = command.arguments().iter().map(|a| bulk_len(a.len())).sum();
    header + verb + args
}

fn put_bulk(buf: &mut BytesMut, data: &[u8]) {
    buf.put_u8(prefix::BULK_STRING);
    buf.put_slice(data.len().to_string().as_bytes());
    buf.put_slice(CRLF);
    buf.put_slice(data);
    buf.put_slice(CRLF);
}

fn bulk_len(len: usize) -> usize {
    1 + digits(len) + 2 + len + 2
}

fn digits(mut n: usize) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parser::parse_response;
    use crate::protocol::types::Response;

    #[test]
    fn test_encode_without_arguments() {
        let cmd = Command::new("ping");
        assert_eq!(&to_bytes(&cmd)[..], b"*1\r\n$4\r\nping\r\n");
    }

    #[test]
    fn test_encode_echo() {
        let cmd = Command::with_args("echo", ["ECHOED"]);
        assert_eq!(&to_bytes(&cmd)[..], b"*2\r\n$4\r\necho\r\n$6\r\nECHOED\r\n");
    }

    #[test]
    fn test_encode_numeric_arguments() {
        let cmd = Command::new("lrange").arg("metavars").arg(0).arg(-1);
        assert_eq!(
            &to_bytes(&cmd)[..],
            b"*4\r\n$6\r\nlrange\r\n$8\r\nmetavars\r\n$1\r\n0\r\n$2\r\n-1\r\n"
        );
    }

    #[test]
    fn test_encode_binary_safe() {
        let cmd = Command::new("set").arg("k").arg(&b"a\r\nb\x00"[..]);
        assert_eq!(
            &to_bytes(&cmd)[..],
            b"*3\r\n$3\r\nset\r\n$1\r\nk\r\n$5\r\na\r\nb\x00\r\n"
        );
    }

    #[test]
    fn test_length_counts_bytes_not_chars() {
        let cmd = Command::with_args("echo", ["héllo"]);
        assert_eq!(
            &to_bytes(&cmd)[..],
            "*2\r\n$4\r\necho\r\n$6\r\nhéllo\r\n".as_bytes()
        );
    }

    #[test]
    fn test_encoded_len_is_exact() {
        let cmd = Command::new("rpush")
            .arg("metavars")
            .arg("x".repeat(1234))
            .arg("");
        assert_eq!(encoded_len(&cmd), to_bytes(&cmd).len());
    }

    #[test]
    fn test_encoding_appends() {
        let mut buf = BytesMut::new();
        encode_command(&Command::new("ping"), &mut buf);
        encode_command(&Command::new("ping"), &mut buf);
        assert_eq!(&buf[..], b"*1\r\n$4\r\nping\r\n*1\r\n$4\r\nping\r\n");
    }

    #[test]
    fn test_request_decodes_as_multi_bulk() {
        // A request is itself valid RESP, which the test servers rely on.
        let cmd = Command::with_args("echo", ["ECHOED"]);
        let (value, _) = parse_response(&to_bytes(&cmd)).unwrap().unwrap();
        assert_eq!(
            value,
            Response::multi_bulk(vec![Response::bulk("echo"), Response::bulk("ECHOED")])
        );
    }
}
