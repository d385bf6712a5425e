//! Join/leave notifications: in-game broadcast plus external sinks.

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::console::ConsoleSession;
use crate::diff::Event;
use crate::template::{Template, TemplateError, to_broadcast};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// An external notification channel.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn send(&self, message: &str) -> Result<(), SinkError>;
}

/// Push notifications through a bearer-token API taking a `message` form field.
pub struct LineNotifySink {
    http: Client,
    api_url: String,
    token: String,
}

#[derive(Serialize)]
struct LineNotifyForm<'a> {
    message: &'a str,
}

impl LineNotifySink {
    pub fn new(http: Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for LineNotifySink {
    fn name(&self) -> &str {
        "line_notify"
    }

    async fn send(&self, message: &str) -> Result<(), SinkError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .form(&LineNotifyForm { message })
            .send()
            .await?;
        ensure_success(response).await
    }
}

/// Chat webhook taking `{"content": ...}`.
pub struct DiscordWebhookSink {
    http: Client,
    webhook_url: String,
}

impl DiscordWebhookSink {
    pub fn new(http: Client, webhook_url: impl Into<String>) -> Self {
        Self {
            http,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhookSink {
    fn name(&self) -> &str {
        "discord_webhook"
    }

    async fn send(&self, message: &str) -> Result<(), SinkError> {
        let response = self
            .http
            .post(&self.webhook_url)
            .json(&json!({ "content": message }))
            .send()
            .await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<(), SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(SinkError::Status { status, body })
}

/// The sinks whose credentials are configured, sharing one HTTP client.
pub fn sinks_from_config(config: &Config) -> Result<Vec<Box<dyn NotificationSink>>, SinkError> {
    let http = Client::builder().timeout(config.notify_timeout).build()?;

    let mut sinks: Vec<Box<dyn NotificationSink>> = Vec::new();
    if let Some(token) = &config.line_notify_token {
        sinks.push(Box::new(LineNotifySink::new(
            http.clone(),
            &config.line_notify_api,
            token,
        )));
    }
    if let Some(url) = &config.discord_webhook_url {
        sinks.push(Box::new(DiscordWebhookSink::new(http, url)));
    }
    Ok(sinks)
}

/// The four message templates.
#[derive(Debug, Clone)]
pub struct Messages {
    pub join: Template,
    pub leave: Template,
    pub join_broadcast: Template,
    pub leave_broadcast: Template,
}

impl Messages {
    pub fn from_config(config: &Config) -> Self {
        Self {
            join: config.join_message.clone(),
            leave: config.leave_message.clone(),
            join_broadcast: config.join_broadcast_message.clone(),
            leave_broadcast: config.leave_broadcast_message.clone(),
        }
    }
}

/// Texts produced for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Sent to the external sinks.
    pub message: String,
    /// Sent with `Broadcast`, already underscore-escaped.
    pub broadcast: String,
}

/// What happened to one event's notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent {
        broadcast_ok: bool,
        delivered: usize,
        failed: usize,
    },
    /// A template referenced a field the record lacks; nothing was sent.
    Skipped(TemplateError),
}

pub struct Dispatcher {
    messages: Messages,
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl Dispatcher {
    pub fn new(messages: Messages, sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { messages, sinks }
    }

    pub fn from_config(config: &Config) -> Result<Self, SinkError> {
        Ok(Self::new(
            Messages::from_config(config),
            sinks_from_config(config)?,
        ))
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn render(&self, event: &Event) -> Result<Rendered, TemplateError> {
        let (message, broadcast) = match event {
            Event::Joined(_) => (&self.messages.join, &self.messages.join_broadcast),
            Event::Left(_) => (&self.messages.leave, &self.messages.leave_broadcast),
        };
        let record = event.record();
        Ok(Rendered {
            message: message.render(record)?,
            broadcast: to_broadcast(&broadcast.render(record)?),
        })
    }

    /// Broadcast the event in game and deliver it to every sink.
    ///
    /// Failures are logged and counted, never returned: one failing sink
    /// does not stop the others, and every delivery has been attempted when
    /// this returns.
    pub async fn dispatch(&self, event: &Event, console: &mut dyn ConsoleSession) -> DispatchOutcome {
        let uid = event.record().uid();
        let rendered = match self.render(event) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(uid, event = event.kind(), error = %e, "skipping notifications for event");
                return DispatchOutcome::Skipped(e);
            }
        };

        let broadcast_ok = match console.run("Broadcast", &[rendered.broadcast.as_str()]).await {
            Ok(_) => true,
            Err(e) => {
                warn!(uid, error = %e, "in-game broadcast failed");
                false
            }
        };

        let results = join_all(self.sinks.iter().map(|sink| {
            let message = rendered.message.as_str();
            async move { (sink.name(), sink.send(message).await) }
        }))
        .await;

        let mut delivered = 0;
        let mut failed = 0;
        for (sink, result) in results {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    warn!(sink, uid, error = %e, "notification delivery failed");
                }
            }
        }

        info!(uid, event = event.kind(), message = %rendered.message, delivered, failed, "notified");
        DispatchOutcome::Sent {
            broadcast_ok,
            delivered,
            failed,
        }
    }
}
