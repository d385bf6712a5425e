pub mod clock;
pub mod config;
pub mod console;
pub mod diff;
mod error;
pub mod logging;
pub mod notify;
pub mod poll;
pub mod snapshot;
pub mod template;

pub use clock::{Clock, TokioClock};
pub use config::{Config, ConfigError};
pub use console::{ConsoleConnector, ConsoleSession, RconConnector};
pub use diff::{Event, diff};
pub use error::CycleError;
pub use notify::{DispatchOutcome, Dispatcher, NotificationSink, SinkError};
pub use poll::{CycleReport, PollLoop};
pub use snapshot::{ParseError, PlayerRecord, Snapshot};
pub use template::{Template, TemplateError};
