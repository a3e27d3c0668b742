//! Connection Module
//!
//! This module manages a single client connection to a RESP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ ConnectionParameters │  (scheme, host/port or path, timeouts, db)
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐      queues AUTH / SELECT
//! │  ConnectionFactory   │ ─────────────────────────┐
//! └──────────┬───────────┘                          │
//!            │                                      ▼
//!            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Connection                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Encode cmd  │───>│ Write bytes │    │ Read bytes  │      │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘      │
//! │                            │                  │             │
//! │                            ▼                  ▼             │
//! │                     ┌──────────────────────────────┐        │
//! │                     │  Transport (TCP / Unix)      │        │
//! │                     └──────────────────────────────┘        │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌────────────────┐     │
//! │                                      │ ResponseReader │     │
//! │                                      └────────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Uses Tokio; each operation is bounded by the configured timeouts
//! - **Buffer Management**: Leftover bytes are kept between reads
//! - **Pipelining**: Any number of writes may precede the matching reads
//! - **Statistics**: Tracks connection and command metrics

pub mod client;
pub mod factory;
pub mod parameters;
pub mod pipeline;
pub mod transport;

pub use client::{Connection, ConnectionError, ConnectionStats, ErrorKind};
pub use factory::{ConnectionFactory, FactoryError};
pub use parameters::{ConnectionParameters, ParametersBuilder, ParametersError, Scheme};
pub use pipeline::Pipeline;
pub use transport::Transport;
