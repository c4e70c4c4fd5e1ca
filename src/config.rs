//! Command-line configuration

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

/// URCLTTY - step debugger for URCL programs
#[derive(Parser, Debug, Clone)]
#[command(name = "urcltty")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Step through URCL programs and watch registers, stack and memory change")]
pub struct Config {
    /// Modules to load at startup, in order (.urcl programs, .urs scripts)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Delay between steps while running continuously, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub interval_ms: u64,

    /// Write log messages to this file (logging is off without it)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Minimum level written to the log file
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl Config {
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}
