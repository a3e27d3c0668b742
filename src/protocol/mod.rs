//! RESP Protocol Implementation
//!
//! The client half of the Redis Serialization Protocol (RESP2).
//!
//! ## Overview
//!
//! Requests are always encoded as arrays of bulk strings. Replies can be
//! any of the five RESP2 types and are decoded into [`Response`].
//!
//! ## Modules
//!
//! - `types`: The `Response` enum and its wire serialization
//! - `codec`: Request encoding
//! - `parser`: Incremental reply decoder and the `ResponseReader` strategy
//!
//! ## Example
//!
//! ```
//! use flashkv_client::commands::Command;
//! use flashkv_client::protocol::{codec, parse_response, Response};
//!
//! let request = codec::to_bytes(&Command::with_args("echo", ["ECHOED"]));
//! assert_eq!(&request[..], b"*2\r\n$4\r\necho\r\n$6\r\nECHOED\r\n");
//!
//! let (reply, _) = parse_response(b"$6\r\nECHOED\r\n").unwrap().unwrap();
//! assert_eq!(reply, Response::bulk("ECHOED"));
//! ```

pub mod codec;
pub mod parser;
pub mod types;

pub use codec::encode_command;
pub use parser::{parse_response, ParseError, ParseResult, RespParser, ResponseReader};
pub use types::Response;
