//! The polling loop.
//!
//! Each cycle: open a console session, fetch `ShowPlayers`, diff against the
//! previous snapshot, notify every event, optionally save and shut the server
//! down when it just emptied, close the session, then sleep one interval.
//! Cycles never overlap.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use palwatch_rcon::RconError;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::console::{ConsoleConnector, ConsoleSession};
use crate::diff::{Event, diff};
use crate::error::CycleError;
use crate::notify::Dispatcher;
use crate::snapshot::Snapshot;

/// Result of one successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// First snapshot since start; nothing was compared.
    Seeded { players: usize },
    Compared {
        events: Vec<Event>,
        /// `Save` and `Shutdown` were both accepted this cycle.
        shutdown_triggered: bool,
    },
}

pub struct PollLoop<C, K> {
    connector: C,
    dispatcher: Dispatcher,
    clock: K,
    interval: Duration,
    restart_on_last_leave: bool,
    shutdown_grace_secs: u32,
    previous: Option<Snapshot>,
    /// A shutdown was due but did not go through.
    shutdown_pending: bool,
}

/// What a cycle leaves behind for the next one.
struct Completed {
    report: CycleReport,
    current: Snapshot,
    shutdown_pending: bool,
}

impl<C, K> PollLoop<C, K>
where
    C: ConsoleConnector,
    K: Clock,
{
    pub fn new(config: &Config, connector: C, dispatcher: Dispatcher, clock: K) -> Self {
        Self {
            connector,
            dispatcher,
            clock,
            interval: config.wait_time,
            restart_on_last_leave: config.restart_on_last_leave,
            shutdown_grace_secs: config.shutdown_grace_secs,
            previous: None,
            shutdown_pending: false,
        }
    }

    /// Snapshot from the last successful cycle.
    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Poll until `stop` resolves. A running cycle is always finished first.
    pub async fn run_until<F>(&mut self, stop: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);
        loop {
            let outcome = self.run_cycle().await;
            self.log_cycle(outcome.as_ref());
            tokio::select! {
                biased;
                _ = &mut stop => {
                    info!("stopping");
                    return;
                }
                _ = self.clock.sleep(self.interval) => {}
            }
        }
    }

    /// One cycle followed by one interval of sleep, whatever the outcome.
    pub async fn tick(&mut self) -> Result<CycleReport, CycleError> {
        let outcome = self.run_cycle().await;
        self.log_cycle(outcome.as_ref());
        self.clock.sleep(self.interval).await;
        outcome
    }

    /// One cycle without sleeping. Every session opened is closed.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        let session = self.connector.connect().await?;
        let mut link = Link {
            connector: &self.connector,
            session: Some(session),
        };
        let outcome = self.cycle(&mut link).await;
        link.release().await;

        let completed = outcome?;
        self.previous = Some(completed.current);
        self.shutdown_pending = completed.shutdown_pending;
        Ok(completed.report)
    }

    async fn cycle(&self, console: &mut dyn ConsoleSession) -> Result<Completed, CycleError> {
        let raw = console.run("ShowPlayers", &[]).await?;
        let current = Snapshot::parse(&raw)?;

        let Some(previous) = &self.previous else {
            let players = current.len();
            info!(players, "initial player list loaded");
            return Ok(Completed {
                report: CycleReport::Seeded { players },
                current,
                shutdown_pending: false,
            });
        };

        let events = diff(previous, &current);
        if !events.is_empty() {
            info!(
                "player list changed\nbefore:\n{}\nafter:\n{}",
                previous.to_table(),
                current.to_table()
            );
        }

        for event in &events {
            self.dispatcher.dispatch(event, console).await;
        }

        let mut shutdown_triggered = false;
        let mut shutdown_pending = false;
        let just_emptied = !previous.is_empty() || self.shutdown_pending;
        if self.restart_on_last_leave && current.is_empty() && just_emptied {
            if self.shutdown_pending {
                info!(grace_secs = self.shutdown_grace_secs, "retrying server restart");
            } else {
                info!(grace_secs = self.shutdown_grace_secs, "last player left, restarting the server");
            }
            match self.shut_down(console).await {
                Ok(()) => shutdown_triggered = true,
                Err(e) => {
                    error!(error = %e, "server shutdown failed, retrying next cycle");
                    shutdown_pending = true;
                }
            }
        }

        Ok(Completed {
            report: CycleReport::Compared {
                events,
                shutdown_triggered,
            },
            current,
            shutdown_pending,
        })
    }

    async fn shut_down(&self, console: &mut dyn ConsoleSession) -> Result<(), RconError> {
        console.run("Save", &[]).await?;
        let grace = self.shutdown_grace_secs.to_string();
        console.run("Shutdown", &[grace.as_str()]).await?;
        Ok(())
    }

    fn log_cycle(&self, outcome: Result<&CycleReport, &CycleError>) {
        if let Err(e) = outcome {
            error!("Error: {e}");
            info!("Restarting in {} seconds...", self.interval.as_secs());
        }
    }
}

/// The console for one cycle.
///
/// A session that fails at the connection level is closed and dropped; the
/// next command opens a fresh one. The failed command is not re-sent.
struct Link<'a, C> {
    connector: &'a C,
    session: Option<Box<dyn ConsoleSession>>,
}

impl<C: ConsoleConnector> Link<'_, C> {
    async fn release(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}

#[async_trait]
impl<C: ConsoleConnector> ConsoleSession for Link<'_, C> {
    async fn run(&mut self, command: &str, args: &[&str]) -> Result<String, RconError> {
        let mut session = match self.session.take() {
            Some(session) => session,
            None => {
                info!(command, "reconnecting to the remote console");
                self.connector.connect().await?
            }
        };

        let result = session.run(command, args).await;
        match &result {
            Err(e) if e.is_connection_error() => {
                warn!(command, error = %e, "dropping broken console session");
                session.close().await;
            }
            _ => self.session = Some(session),
        }
        result
    }

    async fn close(mut self: Box<Self>) {
        self.release().await;
    }
}
