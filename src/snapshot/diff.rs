//! Change classification between consecutive snapshots
//!
//! The [`DiffEngine`] remembers the last value it saw for every register name
//! and memory address. That memory belongs to the debugging session, not to
//! any snapshot: it survives across steps and loads, and is cleared only when
//! the scope is rebuilt (unload or reload).
//!
//! Stack and program highlighting are positional and never pass through here.

use super::{MachineSnapshot, MemoryRow};
use rustc_hash::FxHashMap;

/// How an entry compares with retained history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Not seen before
    New,
    /// Seen before with a different value
    Changed,
    Unchanged,
}

impl Change {
    /// True for entries the sink should highlight
    pub fn is_highlighted(self) -> bool {
        !matches!(self, Change::Unchanged)
    }
}

/// Classification of one snapshot's registers and memory cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDelta {
    pub registers: FxHashMap<String, Change>,
    pub memory: FxHashMap<i64, Change>,
}

impl SnapshotDelta {
    pub fn register(&self, name: &str) -> Option<Change> {
        self.registers.get(name).copied()
    }

    pub fn memory(&self, address: i64) -> Option<Change> {
        self.memory.get(&address).copied()
    }
}

/// Session-scoped retained values
#[derive(Debug, Default)]
pub struct DiffEngine {
    registers: FxHashMap<String, String>,
    memory: FxHashMap<i64, String>,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify every register and memory cell, then retain the new values
    pub fn diff(&mut self, snapshot: &MachineSnapshot) -> SnapshotDelta {
        let mut delta = SnapshotDelta::default();

        for register in &snapshot.registers {
            let change = classify(&mut self.registers, register.name.clone(), register.text());
            delta.registers.insert(register.name.clone(), change);
        }

        for row in &snapshot.memory {
            if let MemoryRow::Cell { address, value } = row {
                let change = classify(&mut self.memory, *address, value.clone());
                delta.memory.insert(*address, change);
            }
        }

        delta
    }

    /// Forget all retained values
    pub fn reset(&mut self) {
        self.registers.clear();
        self.memory.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty() && self.memory.is_empty()
    }
}

fn classify<K: std::hash::Hash + Eq>(
    retained: &mut FxHashMap<K, String>,
    key: K,
    value: String,
) -> Change {
    match retained.insert(key, value.clone()) {
        None => Change::New,
        Some(previous) if previous != value => Change::Changed,
        Some(_) => Change::Unchanged,
    }
}
