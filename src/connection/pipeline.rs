//! Pipelining
//!
//! Pipelining is nothing more than writing several requests before reading
//! any reply. The server answers in request order, so the N-th reply read
//! belongs to the N-th request written. [`Pipeline`] packages that
//! discipline for callers who want all replies at once; callers are free to
//! interleave `write_request` and `read_response` by hand instead.

use super::client::{Connection, ConnectionError};
use crate::commands::Command;
use crate::protocol::{Response, ResponseReader};
use tracing::debug;

/// An ordered batch of commands.
#[derive(Debug, Default, Clone)]
pub struct Pipeline {
    commands: Vec<Command>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command; its reply will be at the same index in the result.
    pub fn add(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Writes every command, then reads exactly one reply per command.
    ///
    /// Server error replies are returned in place. A connection or protocol
    /// error aborts the batch; replies already read are discarded with it.
    pub async fn execute<R: ResponseReader>(
        &self,
        connection: &mut Connection<R>,
    ) -> Result<Vec<Response>, ConnectionError> {
        debug!(commands = self.commands.len(), "Executing pipeline");

        for command in &self.commands {
            connection.write_request(command).await?;
        }

        let mut responses = Vec::with_capacity(self.commands.len());
        for command in &self.commands {
            responses.push(connection.read_response(command).await?);
        }
        Ok(responses)
    }
}

impl FromIterator<Command> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl Extend<Command> for Pipeline {
    fn extend<I: IntoIterator<Item = Command>>(&mut self, iter: I) {
        self.commands.extend(iter);
    }
}
