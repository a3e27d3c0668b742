//! Command Factory
//!
//! The connection never builds commands itself. Callers obtain them from a
//! [`CommandFactory`], which knows which verbs a given server understands.
//! [`ServerProfile`] is the stock factory covering the commands a plain
//! Redis-compatible server accepts.

use super::command::{Command, IntoArgument};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while building a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command '{0}' is not a registered Redis command.")]
    UnknownCommand(String),

    #[error("empty command name")]
    EmptyVerb,
}

/// Produces [`Command`] values by verb name.
pub trait CommandFactory {
    /// Returns true if the factory can build `verb`.
    fn supports(&self, verb: &str) -> bool;

    /// Creates a command with no arguments.
    fn create_command(&self, verb: &str) -> Result<Command, CommandError> {
        if verb.is_empty() {
            return Err(CommandError::EmptyVerb);
        }
        if !self.supports(verb) {
            return Err(CommandError::UnknownCommand(verb.to_string()));
        }
        Ok(Command::new(verb.to_lowercase()))
    }

    /// Creates a command and sets its arguments.
    fn create_command_with<I, A>(&self, verb: &str, args: I) -> Result<Command, CommandError>
    where
        Self: Sized,
        I: IntoIterator<Item = A>,
        A: IntoArgument,
    {
        let mut cmd = self.create_command(verb)?;
        cmd.set_arguments(args);
        Ok(cmd)
    }
}

/// Verbs understood by a plain Redis-compatible server.
const DEFAULT_VERBS: &[&str] = &[
    // connection
    "auth", "echo", "ping", "quit", "select",
    // server
    "dbsize", "flushall", "flushdb", "info", "time",
    // keys
    "del", "exists", "expire", "keys", "persist", "pexpire", "pttl", "rename", "renamenx", "ttl",
    "type",
    // strings
    "append", "decr", "decrby", "get", "getset", "incr", "incrby", "incrbyfloat", "mget", "mset",
    "psetex", "set", "setex", "setnx", "strlen",
    // lists
    "blpop", "brpop", "lindex", "llen", "lpop", "lpush", "lrange", "lrem", "lset", "rpop",
    "rpush",
    // transactions
    "discard", "exec", "multi", "unwatch", "watch",
];

/// The stock command factory.
#[derive(Debug, Clone)]
pub struct ServerProfile {
    verbs: HashSet<String>,
}

impl ServerProfile {
    pub fn new() -> Self {
        Self {
            verbs: DEFAULT_VERBS.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Registers an additional verb, e.g. a module command.
    pub fn define_command(&mut self, verb: &str) {
        self.verbs.insert(verb.to_lowercase());
    }
}

impl Default for ServerProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for ServerProfile {
    fn supports(&self, verb: &str) -> bool {
        self.verbs.contains(&verb.to_lowercase())
    }
}
