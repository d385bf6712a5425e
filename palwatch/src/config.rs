use std::env::var;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

use crate::template::{Template, TemplateError};

pub const DEFAULT_JOIN_MESSAGE: &str = "{name} ({steamid}) has joined the server.";
pub const DEFAULT_LEAVE_MESSAGE: &str = "{name} ({steamid}) has left the server.";
pub const DEFAULT_LINE_NOTIFY_API: &str = "https://notify-api.line.me/api/notify";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} is not a valid message template: {source}")]
    Template {
        key: &'static str,
        #[source]
        source: TemplateError,
    },
}

/// Verbosity names accepted in `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Critical,
    Fatal,
    Error,
    Warning,
    Warn,
    Info,
    Debug,
    NotSet,
}

impl LogLevel {
    /// Equivalent `tracing` filter directive.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Critical | LogLevel::Fatal | LogLevel::Error => "error",
            LogLevel::Warning | LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::NotSet => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(LogLevel::Critical),
            "FATAL" => Ok(LogLevel::Fatal),
            "ERROR" => Ok(LogLevel::Error),
            "WARNING" => Ok(LogLevel::Warning),
            "WARN" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "NOTSET" => Ok(LogLevel::NotSet),
            other => Err(format!(
                "unknown level '{other}' (expected CRITICAL|FATAL|ERROR|WARNING|WARN|INFO|DEBUG|NOTSET)"
            )),
        }
    }
}

/// Application configuration with environment variable overrides
#[derive(Clone)]
pub struct Config {
    /// Remote console address
    /// Env: IP (default: 127.0.0.1)
    pub ip: String,

    /// Remote console port
    /// Env: PORT (default: 25575)
    pub port: u16,

    /// Remote console password; no login when unset
    /// Env: PASSWORD (optional)
    pub password: Option<String>,

    /// Push notification endpoint
    /// Env: LINE_NOTIFY_API (default: https://notify-api.line.me/api/notify)
    pub line_notify_api: String,

    /// Bearer token for the push endpoint; sink disabled when unset
    /// Env: LINE_NOTIFY_TOKEN (optional)
    pub line_notify_token: Option<String>,

    /// Chat webhook; sink disabled when unset
    /// Env: DISCORD_WEBHOOK_URL (optional)
    pub discord_webhook_url: Option<String>,

    /// Env: JOIN_MESSAGE (default: "{name} ({steamid}) has joined the server.")
    pub join_message: Template,

    /// Env: LEAVE_MESSAGE (default: "{name} ({steamid}) has left the server.")
    pub leave_message: Template,

    /// In-game variant, spaces become underscores when sent
    /// Env: JOIN_BROADCAST_MESSAGE (default: same as JOIN_MESSAGE's default)
    pub join_broadcast_message: Template,

    /// Env: LEAVE_BROADCAST_MESSAGE (default: same as LEAVE_MESSAGE's default)
    pub leave_broadcast_message: Template,

    /// Save and shut the server down when the last player leaves
    /// Env: RESTART_ON_LAST_LEAVE (default: false)
    pub restart_on_last_leave: bool,

    /// Seconds passed to `Shutdown`
    /// Env: SHUTDOWN_GRACE_SECS (default: 5)
    pub shutdown_grace_secs: u32,

    /// Poll interval
    /// Env: WAIT_TIME in seconds (default: 5)
    pub wait_time: Duration,

    /// Env: LOG_LEVEL (default: INFO); RUST_LOG takes precedence when set
    pub log_level: LogLevel,

    /// Directory for the daily rotated log file
    /// Env: LOG_DIR (default: logs)
    pub log_dir: PathBuf,

    /// Bound on connecting to the console and on each command
    /// Env: RCON_TIMEOUT_SECS (default: 10)
    pub rcon_timeout: Duration,

    /// Bound on each notification request
    /// Env: NOTIFY_TIMEOUT_SECS (default: 10)
    pub notify_timeout: Duration,
}

impl Config {
    /// Load configuration from `.env` and environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|key| var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Keys are tried
    /// upper-case first, then lower-case.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let join_message = env.template("JOIN_MESSAGE", DEFAULT_JOIN_MESSAGE)?;
        let leave_message = env.template("LEAVE_MESSAGE", DEFAULT_LEAVE_MESSAGE)?;
        Ok(Self {
            ip: env.string_or("IP", "127.0.0.1"),
            port: env.parse_or("PORT", 25575)?,
            password: env.optional("PASSWORD"),
            line_notify_api: env.string_or("LINE_NOTIFY_API", DEFAULT_LINE_NOTIFY_API),
            line_notify_token: env.optional("LINE_NOTIFY_TOKEN"),
            discord_webhook_url: env.optional("DISCORD_WEBHOOK_URL"),
            join_broadcast_message: env.template("JOIN_BROADCAST_MESSAGE", DEFAULT_JOIN_MESSAGE)?,
            leave_broadcast_message: env
                .template("LEAVE_BROADCAST_MESSAGE", DEFAULT_LEAVE_MESSAGE)?,
            join_message,
            leave_message,
            restart_on_last_leave: env.bool_or("RESTART_ON_LAST_LEAVE", false)?,
            shutdown_grace_secs: env.parse_or("SHUTDOWN_GRACE_SECS", 5)?,
            wait_time: Duration::from_secs(env.parse_or("WAIT_TIME", 5)?),
            log_level: env.parse_or("LOG_LEVEL", LogLevel::Info)?,
            log_dir: PathBuf::from(env.string_or("LOG_DIR", "logs")),
            rcon_timeout: Duration::from_secs(env.parse_or("RCON_TIMEOUT_SECS", 10)?),
            notify_timeout: Duration::from_secs(env.parse_or("NOTIFY_TIMEOUT_SECS", 10)?),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None).expect("built-in defaults are valid")
    }
}

/// One-line summary with credentials reduced to set/unset.
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "console={}:{} (password {}), line_notify={}, discord_webhook={}, wait_time={}s, \
             restart_on_last_leave={} (grace {}s), log_level={:?}, log_dir={}",
            self.ip,
            self.port,
            set_or_unset(self.password.is_some()),
            set_or_unset(self.line_notify_token.is_some()),
            set_or_unset(self.discord_webhook_url.is_some()),
            self.wait_time.as_secs(),
            self.restart_on_last_leave,
            self.shutdown_grace_secs,
            self.log_level,
            self.log_dir.display(),
        )
    }
}

fn set_or_unset(set: bool) -> &'static str {
    if set { "set" } else { "unset" }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).or_else(|| (self.0)(&key.to_ascii_lowercase()))
    }

    /// Unset and empty are the same thing.
    fn optional(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn bool_or(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => Ok(true),
            "0" | "false" | "no" | "n" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value,
                reason: "expected true or false".to_string(),
            }),
        }
    }

    fn template(&self, key: &'static str, default: &str) -> Result<Template, ConfigError> {
        // Templates keep their surrounding whitespace.
        let raw = self.get(key).filter(|v| !v.is_empty());
        Template::parse(raw.as_deref().unwrap_or(default))
            .map_err(|source| ConfigError::Template { key, source })
    }
}
