//! Debugging session: the single writer of the execution scope
//!
//! A [`Session`] wires together the components that keep the displayed state
//! in sync with the program:
//!
//! - [`modules`]: the loaded module list and the scope it produced
//! - [`scheduler`]: step admission and continuous-run timing
//! - [`crate::snapshot`]: extraction and change classification
//!
//! Every operation takes `&mut self`, so manual steps, timer ticks, loads and
//! unloads are serialized by construction. After each operation that may have
//! changed the scope, the session extracts a snapshot, classifies it against
//! retained history and publishes the result as a completed [`DebugFrame`].

pub mod modules;
pub mod scheduler;

use crate::backend::{Backend, ExecError, ModuleSource};
use crate::snapshot::{DiffEngine, MachineSnapshot, SnapshotDelta};
use log::{debug, info, warn};
use modules::{LoadErrorPrompt, ModuleManager, Rebuild};
use scheduler::{RunState, Signals, StepScheduler};
use std::time::{Duration, Instant};

/// What the presentation sink renders: a snapshot and its classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugFrame {
    pub snapshot: MachineSnapshot,
    pub delta: SnapshotDelta,
}

/// Result of a step request
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The step ran; signals were read afterwards
    Completed(Signals),
    /// The step raised; continuous running was stopped
    Failed(ExecError),
    /// Another step was in flight, so this request was dropped
    Skipped,
}

pub struct Session<B: Backend> {
    modules: ModuleManager<B>,
    diff: DiffEngine,
    scheduler: StepScheduler,
    frame: DebugFrame,
    revision: u64,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: B, step_interval: Duration) -> Self {
        Session {
            modules: ModuleManager::new(backend),
            diff: DiffEngine::new(),
            scheduler: StepScheduler::new(step_interval),
            frame: DebugFrame::default(),
            revision: 0,
        }
    }

    /// The most recently published frame
    pub fn frame(&self) -> &DebugFrame {
        &self.frame
    }

    /// Number of frames published so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn modules(&self) -> &[ModuleSource] {
        self.modules.modules()
    }

    pub fn backend(&self) -> &B {
        self.modules.backend()
    }

    pub fn scope(&self) -> &B::Scope {
        self.modules.scope()
    }

    pub fn scheduler(&self) -> &StepScheduler {
        &self.scheduler
    }

    pub fn run_state(&self) -> RunState {
        let signals = Signals::read(self.modules.backend(), self.modules.scope());
        self.scheduler.state(signals.halted)
    }

    /// Load a module on top of the current scope.
    ///
    /// Retained diff history is kept, so values bound by the new module show
    /// as changed against what was displayed before.
    pub fn load_file(&mut self, source: ModuleSource, prompt: &mut dyn LoadErrorPrompt) -> bool {
        let loaded = self.modules.load_file(source, prompt);
        if loaded {
            self.publish();
        }
        loaded
    }

    /// Rebuild the scope from every loaded module
    pub fn reload(&mut self, prompt: &mut dyn LoadErrorPrompt) -> Rebuild {
        let result = self.modules.reload(prompt);
        self.after_rebuild(result)
    }

    /// Remove one module and rebuild from the rest
    pub fn unload_at(&mut self, index: usize, prompt: &mut dyn LoadErrorPrompt) -> Rebuild {
        let result = self.modules.unload_at(index, prompt);
        self.after_rebuild(result)
    }

    fn after_rebuild(&mut self, result: Rebuild) -> Rebuild {
        if result != Rebuild::Unchanged {
            // A rebuilt scope starts a new history
            self.scheduler.stop();
            self.diff.reset();
            self.publish();
        }
        result
    }

    /// Execute exactly one step and publish the resulting frame
    pub fn step(&mut self) -> StepOutcome {
        if !self.scheduler.begin_step() {
            debug!("step already in flight, request dropped");
            return StepOutcome::Skipped;
        }

        let outcome = match self.modules.step() {
            Ok(()) => {
                let signals = Signals::read(self.modules.backend(), self.modules.scope());
                if self.scheduler.after_step(signals) {
                    info!(
                        "continuous run stopped (halt: {}, break: {})",
                        signals.halted, signals.broke
                    );
                }
                StepOutcome::Completed(signals)
            }
            Err(error) => {
                warn!("step failed: {}", error);
                self.scheduler.stop();
                StepOutcome::Failed(error)
            }
        };

        self.publish();
        self.scheduler.end_step();
        outcome
    }

    /// Start stepping on every interval until halt, break or an error
    pub fn start_continuous(&mut self, now: Instant) {
        info!("continuous run started");
        self.scheduler.start(now);
    }

    /// Stop continuous running without stepping
    pub fn interrupt(&mut self) {
        if self.scheduler.is_running() {
            info!("continuous run interrupted");
        }
        self.scheduler.stop();
    }

    /// Run a continuous-run step if one is due at `now`
    pub fn tick(&mut self, now: Instant) -> Option<StepOutcome> {
        if self.scheduler.take_tick(now) {
            Some(self.step())
        } else {
            None
        }
    }

    /// Extract, classify and publish the current scope
    fn publish(&mut self) {
        let snapshot = MachineSnapshot::extract(self.modules.backend(), self.modules.scope());
        let delta = self.diff.diff(&snapshot);
        self.frame = DebugFrame { snapshot, delta };
        self.revision += 1;
    }

    /// Publish a frame without changing anything, e.g. after startup
    pub fn refresh(&mut self) {
        self.publish();
    }
}
