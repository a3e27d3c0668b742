//! # FlashKV Client - RESP Connection Core
//!
//! A single-connection client for Redis-compatible servers (including
//! FlashKV itself). It speaks RESP2 over TCP or Unix domain sockets and
//! covers the protocol core only: connection lifecycle, request encoding,
//! reply decoding, and pipelining.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          FlashKV Client                                 │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │  Command    │───>│ Connection  │───>│   Codec     │──> socket        │
//! │  │  Factory    │    │             │    │ (requests)  │                  │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘                  │
//! │                            │                                            │
//! │                            ▼                                            │
//! │                     ┌─────────────┐                                     │
//! │       socket ──────>│ RESP Parser │──> Response                         │
//! │                     │ (replies)   │                                     │
//! │                     └─────────────┘                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use flashkv_client::commands::{CommandFactory, ServerProfile};
//! use flashkv_client::connection::{ConnectionFactory, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let profile = ServerProfile::new();
//!     let mut conn = ConnectionFactory::new(profile.clone())
//!         .create_from_uri("tcp://127.0.0.1:6379?database=15&timeout=0.5")?;
//!
//!     // Forces the connection and runs SELECT 15 first
//!     let pong = conn.execute_command(&profile.create_command("ping")?).await?;
//!     println!("{}", pong);
//!
//!     // Pipelining: two writes, then two reads in the same order
//!     let mut pipeline = Pipeline::new();
//!     pipeline
//!         .add(profile.create_command("ping")?)
//!         .add(profile.create_command_with("echo", ["ECHOED"])?);
//!     let replies = pipeline.execute(&mut conn).await?;
//!     assert_eq!(replies.len(), 2);
//!
//!     conn.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Reply types, request codec, reply decoder
//! - [`commands`]: Command values and the command factory
//! - [`connection`]: Parameters, transport, the connection itself, pipelining
//!
//! ## Error Handling
//!
//! Local failures are [`ConnectionError`]s, classified by
//! [`ErrorKind`]: `Usage` (fix the call order), `Connection` and
//! `Protocol` (the connection was torn down; reconnect). Error replies
//! from the server are regular [`Response::Error`] values.

pub mod commands;
pub mod connection;
pub mod protocol;

// Re-export commonly used types for convenience
pub use commands::{Command, CommandFactory, ServerProfile};
pub use connection::{
    Connection, ConnectionError, ConnectionFactory, ConnectionParameters, ErrorKind, Pipeline,
};
pub use protocol::{ParseError, RespParser, Response, ResponseReader};

/// Version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
