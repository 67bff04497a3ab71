//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};

use crate::state::EngineSettings;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "session-timer")]
#[command(about = "Reload-safe timer for the active study session")]
#[command(version)]
pub struct Config {
    /// Directory holding persisted timer state
    #[arg(long, default_value = ".session-timer")]
    pub state_dir: PathBuf,

    /// Browsing context the timer belongs to; each context keeps its own record
    #[arg(long, default_value = "default")]
    pub context: String,

    /// Tick period in milliseconds
    #[arg(long, default_value = "1000")]
    pub tick_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start timing a session, replacing any running timer
    Start {
        /// Session identifier
        #[arg(long)]
        session: String,

        /// Session start as ISO-8601; defaults to now
        #[arg(long)]
        start: Option<String>,

        /// Session end as ISO-8601, or "infinity" for an open-ended session
        #[arg(long)]
        end: Option<String>,

        /// Keep running and print every tick
        #[arg(long)]
        watch: bool,

        /// Print states as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Stop the timer and forget the persisted session
    Stop,

    /// Resume persisted state and print it once
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Resume persisted state and print every tick until the timer is no longer active
    Watch {
        #[arg(long)]
        json: bool,
    },
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Directory of the store for the selected context
    pub fn store_dir(&self) -> PathBuf {
        self.state_dir.join(&self.context)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            tick_period: Duration::from_millis(self.tick_ms),
            ..EngineSettings::default()
        }
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["session-timer", "status"]).unwrap();
        assert_eq!(config.store_dir(), PathBuf::from(".session-timer").join("default"));
        assert_eq!(config.engine_settings().tick_period, Duration::from_secs(1));
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.command, Command::Status { json: false });
    }

    #[test]
    fn start_arguments() {
        let config = Config::try_parse_from([
            "session-timer",
            "--context",
            "tab-2",
            "-v",
            "start",
            "--session",
            "17",
            "--end",
            "infinity",
            "--watch",
        ])
        .unwrap();
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.store_dir(), PathBuf::from(".session-timer").join("tab-2"));
        assert_eq!(
            config.command,
            Command::Start {
                session: "17".to_string(),
                start: None,
                end: Some("infinity".to_string()),
                watch: true,
                json: false,
            }
        );
    }

    #[test]
    fn session_is_required_for_start() {
        assert!(Config::try_parse_from(["session-timer", "start"]).is_err());
    }
}
