//! # Introduction
//!
//! URCLTTY is a step debugger for URCL programs. It loads one or more modules
//! into an execution scope, advances the program one instruction at a time
//! (manually or on a timer) and after every step shows registers, the program
//! listing, the stack and memory, highlighting what changed.
//!
//! ## Pipeline
//!
//! ```text
//! Modules → Backend scope → Step → Snapshot → Diff → TUI
//! ```
//!
//! 1. [`backend`]: the capability boundary to the execution engine, plus the
//!    native URCL backend (assembler, machine, `.urs` preset scripts).
//! 2. [`session`]: the single writer of the scope: module loading and
//!    rebuilds, step admission and continuous-run timing.
//! 3. [`snapshot`]: extracts a presentation-ready [`snapshot::MachineSnapshot`]
//!    from a scope and classifies it against the previous one.
//! 4. [`config`] and [`logging`]: command-line options and the optional log file.
//! 5. [`ui`]: ratatui-based TUI; not part of the stable library API.

pub mod backend;
pub mod config;
pub mod logging;
pub mod session;
pub mod snapshot;
pub mod ui;
