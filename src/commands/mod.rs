//! Commands Module
//!
//! Commands are the requests a client sends. This module holds the
//! [`Command`] value itself and the [`CommandFactory`] collaborator callers
//! use to build commands by verb name.
//!
//! ```text
//! ┌─────────────────┐   create_command("echo")   ┌─────────────────┐
//! │ CommandFactory  │ ─────────────────────────> │    Command      │
//! │ (ServerProfile) │                            │ verb + args     │
//! └─────────────────┘                            └────────┬────────┘
//!                                                         │
//!                                                         ▼
//!                                                 Connection (encode)
//! ```

pub mod command;
pub mod factory;

pub use command::{Command, IntoArgument};
pub use factory::{CommandError, CommandFactory, ServerProfile};
