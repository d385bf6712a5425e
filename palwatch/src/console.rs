//! The remote console as seen by the poll loop.

use std::time::Duration;

use async_trait::async_trait;
use palwatch_rcon::{Client, RconError};
use tracing::debug;

use crate::config::Config;

/// An open console session.
#[async_trait]
pub trait ConsoleSession: Send {
    /// Run `command` with space-joined `args` and return the response text.
    async fn run(&mut self, command: &str, args: &[&str]) -> Result<String, RconError>;

    /// Release the session. Never fails; problems are only logged.
    async fn close(self: Box<Self>);
}

/// Opens a fresh [`ConsoleSession`] for every poll cycle.
#[async_trait]
pub trait ConsoleConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ConsoleSession>, RconError>;
}

/// Production connector speaking Source RCON.
#[derive(Debug, Clone)]
pub struct RconConnector {
    host: String,
    port: u16,
    password: Option<String>,
    timeout: Duration,
}

impl RconConnector {
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.ip.clone(),
            port: config.port,
            password: config.password.clone(),
            timeout: config.rcon_timeout,
        }
    }
}

#[async_trait]
impl ConsoleConnector for RconConnector {
    async fn connect(&self) -> Result<Box<dyn ConsoleSession>, RconError> {
        let client =
            Client::connect(&self.host, self.port, self.password.as_deref(), self.timeout).await?;
        Ok(Box::new(client))
    }
}

#[async_trait]
impl ConsoleSession for Client {
    async fn run(&mut self, command: &str, args: &[&str]) -> Result<String, RconError> {
        Client::run(self, command, args).await
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = Client::close(*self).await {
            debug!(error = %e, "rcon session did not close cleanly");
        }
    }
}
