//! Chat command channel: parsing, execution and Telegram polling.

mod handler;
mod listener;

pub use handler::CommandHandler;
pub use listener::CommandListener;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A command received from the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Ping,
    Pause,
    Resume,
    /// `/threshold <value>`; the raw argument is validated on execution.
    Threshold(Option<String>),
    Pairs,
    /// `/alerts [n]`; `None` means the whole history.
    Alerts(Option<usize>),
    Status,
}

/// Command parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("not a command")]
    NotACommand,
    #[error("unknown command /{0}")]
    Unknown(String),
    #[error("invalid argument for /{command}, expected {usage}")]
    InvalidArgument {
        command: &'static str,
        usage: &'static str,
    },
}

impl FromStr for Command {
    type Err = CommandParseError;

    /// Parses "/name[@bot] [args]". Names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let head = parts
            .next()
            .and_then(|h| h.strip_prefix('/'))
            .ok_or(CommandParseError::NotACommand)?;

        // "/pause@my_bot" -> "pause"
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let arg = parts.next();

        match name.as_str() {
            "start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            "ping" => Ok(Command::Ping),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "threshold" => Ok(Command::Threshold(arg.map(str::to_string))),
            "pairs" => Ok(Command::Pairs),
            "alerts" => match arg {
                None => Ok(Command::Alerts(None)),
                Some(raw) => raw
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .map(|n| Command::Alerts(Some(n)))
                    .ok_or(CommandParseError::InvalidArgument {
                        command: "alerts",
                        usage: "/alerts 5",
                    }),
            },
            "status" => Ok(Command::Status),
            "" => Err(CommandParseError::NotACommand),
            other => Err(CommandParseError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Start => write!(f, "/start"),
            Command::Help => write!(f, "/help"),
            Command::Ping => write!(f, "/ping"),
            Command::Pause => write!(f, "/pause"),
            Command::Resume => write!(f, "/resume"),
            Command::Threshold(_) => write!(f, "/threshold"),
            Command::Pairs => write!(f, "/pairs"),
            Command::Alerts(_) => write!(f, "/alerts"),
            Command::Status => write!(f, "/status"),
        }
    }
}
