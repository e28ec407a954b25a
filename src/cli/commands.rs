//! Command definitions for the CLI
//!
//! Contains the clap-based argument definitions and the line protocol read
//! from stdin while `ddm run` is active.

use clap::{Parser, Subcommand};
use data_daemons::AppError;
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "ddm")]
#[command(about = "Run timer- and event-driven data daemons")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "DDM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Write an example configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Check the configuration and list the daemons it defines
    Validate,

    /// Fetch one daemon's data once and print it as JSON
    Fetch {
        /// Daemon name
        name: String,
    },

    /// Start every daemon and print broadcasts until interrupted
    Run,
}

/// A control command typed on stdin while daemons are running
#[derive(Debug, Clone, PartialEq)]
pub enum ControlLine {
    /// `emit <event> [json]`
    Emit { event: String, payload: Option<Value> },
    /// `status <daemon> <status>`
    Status { daemon: String, status: String },
    /// `get <daemon>`
    Get { daemon: String },
    /// `fetch <daemon>`
    Fetch { daemon: String },
    /// `start <daemon>`
    Start { daemon: String },
    /// `stop <daemon>`
    Stop { daemon: String },
    /// `list`
    List,
    /// `quit` or `exit`
    Quit,
}

impl FromStr for ControlLine {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let single_arg = |what: &str| -> Result<String, AppError> {
            if rest.is_empty() || rest.contains(char::is_whitespace) {
                Err(AppError::invalid_argument(
                    command,
                    format!("expected exactly one {}", what),
                ))
            } else {
                Ok(rest.to_string())
            }
        };

        match command {
            "emit" => {
                let (event, payload) = match rest.split_once(char::is_whitespace) {
                    Some((event, json)) => {
                        let payload = serde_json::from_str(json.trim()).map_err(|e| {
                            AppError::invalid_argument("emit", format!("payload is not JSON: {}", e))
                        })?;
                        (event, Some(payload))
                    }
                    None => (rest, None),
                };
                if event.is_empty() {
                    return Err(AppError::invalid_argument("emit", "missing event name"));
                }
                Ok(ControlLine::Emit {
                    event: event.to_string(),
                    payload,
                })
            }
            "status" => match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
                [daemon, status] => Ok(ControlLine::Status {
                    daemon: daemon.to_string(),
                    status: status.to_string(),
                }),
                _ => Err(AppError::invalid_argument(
                    "status",
                    "usage: status <daemon> <status>",
                )),
            },
            "get" => Ok(ControlLine::Get {
                daemon: single_arg("daemon name")?,
            }),
            "fetch" => Ok(ControlLine::Fetch {
                daemon: single_arg("daemon name")?,
            }),
            "start" => Ok(ControlLine::Start {
                daemon: single_arg("daemon name")?,
            }),
            "stop" => Ok(ControlLine::Stop {
                daemon: single_arg("daemon name")?,
            }),
            "list" => Ok(ControlLine::List),
            "quit" | "exit" => Ok(ControlLine::Quit),
            "" => Err(AppError::invalid_argument("command", "empty line")),
            other => Err(AppError::invalid_argument(other, "unknown command")),
        }
    }
}
