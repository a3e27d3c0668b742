//! Connection Factory
//!
//! Turns [`ConnectionParameters`] into a ready-to-use [`Connection`].
//! Authentication and database selection are not features of the
//! connection itself; the factory expresses them as connect-commands so
//! they are replayed on every reconnect.

use super::client::Connection;
use super::parameters::{ConnectionParameters, ParametersError};
use crate::commands::{Command, CommandError, CommandFactory, ServerProfile};

/// Builds connections and their connect-commands.
#[derive(Debug, Clone, Default)]
pub struct ConnectionFactory {
    profile: ServerProfile,
}

impl ConnectionFactory {
    pub fn new(profile: ServerProfile) -> Self {
        Self { profile }
    }

    /// The commands queued for `params`: `AUTH` first, then `SELECT`.
    pub fn initialization_commands(
        &self,
        params: &ConnectionParameters,
    ) -> Result<Vec<Command>, CommandError> {
        let mut commands = Vec::new();
        if let Some(password) = params.password() {
            commands.push(self.profile.create_command_with("auth", [password])?);
        }
        if let Some(database) = params.database() {
            commands.push(self.profile.create_command_with("select", [database])?);
        }
        Ok(commands)
    }

    /// Creates a disconnected connection with its connect-commands queued.
    pub fn create(&self, params: ConnectionParameters) -> Result<Connection, CommandError> {
        let commands = self.initialization_commands(&params)?;
        let mut connection = Connection::new(params);
        for command in commands {
            connection.add_connect_command(command);
        }
        Ok(connection)
    }

    /// Parses `uri` and creates a connection for it.
    pub fn create_from_uri(&self, uri: &str) -> Result<Connection, FactoryError> {
        let params: ConnectionParameters = uri.parse()?;
        Ok(self.create(params)?)
    }
}

/// Errors raised by [`ConnectionFactory::create_from_uri`].
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error(transparent)]
    Parameters(#[from] ParametersError),

    #[error(transparent)]
    Command(#[from] CommandError),
}
