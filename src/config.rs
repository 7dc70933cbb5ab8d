//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

use crate::state::DurationIndex;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "countdown-timer")]
#[command(about = "A single-session countdown timer served over HTTP")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20555")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Initial duration slot: 0 = 5min, 1 = 10min, ... 11 = 60min
    #[arg(short, long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=11))]
    pub duration_index: u8,

    /// JSON file to keep run history in (in-memory when omitted)
    #[arg(long)]
    pub history_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Initial duration slot, validated
    pub fn duration(&self) -> anyhow::Result<DurationIndex> {
        Ok(DurationIndex::new(self.duration_index as usize)?)
    }
}
