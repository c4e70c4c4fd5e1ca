//! File sink for the crate's log records
//!
//! The terminal UI owns stdout and stderr, so records go to a file given on
//! the command line. Without one no subscriber is installed and every `log`
//! macro is a no-op.
//!
//! The crate logs through the `log` facade; `tracing-subscriber` formats the
//! records and its `tracing-log` bridge forwards `log` macros into it.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{format, SubscriberBuilder};

type FileSubscriberBuilder =
    SubscriberBuilder<format::DefaultFields, format::Format, LevelFilter, Mutex<File>>;

/// Error raised while installing the subscriber
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("could not open log file: {0}")]
    Io(#[from] io::Error),
    #[error("could not install the log subscriber: {0}")]
    Install(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Plain-text formatter writing records at `level` or above to `file`
fn file_subscriber(file: File, level: LevelFilter) -> FileSubscriberBuilder {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
}

/// Install the file subscriber globally and route `log` records to it
pub fn init(path: &Path, level: LevelFilter) -> Result<(), LoggingError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    file_subscriber(file, level)
        .try_init()
        .map_err(LoggingError::Install)
}
