//! Loaded module list and the scope built from it
//!
//! The [`ModuleManager`] is the only owner of the current scope. Whatever is
//! listed in [`ModuleManager::modules`] is exactly what the scope was built
//! from, in order:
//!
//! - [`ModuleManager::load_file`] loads into a scratch copy and commits it
//!   only when the load succeeds or the user chooses to continue past the
//!   error
//! - [`ModuleManager::unload_at`] and [`ModuleManager::reload`] rebuild from a
//!   fresh scope; aborting any step of a rebuild empties both the list and the
//!   scope

use crate::backend::{Backend, ExecError, LoadError, ModuleSource};
use log::{info, warn};

/// Answer to a failed load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadDecision {
    /// Keep the module despite the error
    Continue,
    /// Abandon the whole load operation
    Abort,
}

/// Asks the user what to do when a module fails to load
pub trait LoadErrorPrompt {
    fn on_load_error(&mut self, source: &ModuleSource, error: &LoadError) -> LoadDecision;
}

impl<F> LoadErrorPrompt for F
where
    F: FnMut(&ModuleSource, &LoadError) -> LoadDecision,
{
    fn on_load_error(&mut self, source: &ModuleSource, error: &LoadError) -> LoadDecision {
        self(source, error)
    }
}

/// A fixed answer, for non-interactive callers
impl LoadErrorPrompt for LoadDecision {
    fn on_load_error(&mut self, _source: &ModuleSource, _error: &LoadError) -> LoadDecision {
        *self
    }
}

/// Result of an unload or reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebuild {
    /// Every surviving module was loaded (or continued past)
    Completed,
    /// A load was aborted; modules and scope are now empty
    Aborted,
    /// The requested index did not exist; nothing was touched
    Unchanged,
}

/// Ordered module list plus the scope it produced
pub struct ModuleManager<B: Backend> {
    backend: B,
    modules: Vec<ModuleSource>,
    scope: B::Scope,
}

impl<B: Backend> ModuleManager<B> {
    pub fn new(backend: B) -> Self {
        let scope = backend.create_scope();
        ModuleManager {
            backend,
            modules: Vec::new(),
            scope,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn scope(&self) -> &B::Scope {
        &self.scope
    }

    pub fn modules(&self) -> &[ModuleSource] {
        &self.modules
    }

    /// Load one module on top of the current scope.
    ///
    /// Returns `false` only when the user aborts after an error; the scope is
    /// then left exactly as it was before the call.
    pub fn load_file(&mut self, mut source: ModuleSource, prompt: &mut dyn LoadErrorPrompt) -> bool {
        let mut scratch = self.scope.clone();
        let result = source
            .refresh()
            .and_then(|()| self.backend.load_source(&mut scratch, &source));

        match result {
            Ok(()) => info!("loaded {}", source.name),
            Err(error) => {
                warn!("could not load {}: {}", source.name, error);
                if prompt.on_load_error(&source, &error) == LoadDecision::Abort {
                    info!("load of {} aborted", source.name);
                    return false;
                }
                info!("keeping {} despite the error", source.name);
            }
        }

        self.scope = scratch;
        self.modules.push(source);
        true
    }

    /// Rebuild the scope from the full module list
    pub fn reload(&mut self, prompt: &mut dyn LoadErrorPrompt) -> Rebuild {
        self.rebuild(None, prompt)
    }

    /// Drop the module at `index` and rebuild from the remaining ones
    pub fn unload_at(&mut self, index: usize, prompt: &mut dyn LoadErrorPrompt) -> Rebuild {
        if index >= self.modules.len() {
            warn!("no module at index {}", index);
            return Rebuild::Unchanged;
        }
        self.rebuild(Some(index), prompt)
    }

    fn rebuild(&mut self, remove: Option<usize>, prompt: &mut dyn LoadErrorPrompt) -> Rebuild {
        let mut surviving = std::mem::take(&mut self.modules);
        if let Some(index) = remove {
            let removed = surviving.remove(index);
            info!("unloading {}", removed.name);
        }

        self.scope = self.backend.create_scope();
        for source in surviving {
            if !self.load_file(source, prompt) {
                self.clear();
                return Rebuild::Aborted;
            }
        }

        info!("scope rebuilt from {} module(s)", self.modules.len());
        Rebuild::Completed
    }

    /// Empty program state: no modules and a fresh scope
    pub fn clear(&mut self) {
        self.modules.clear();
        self.scope = self.backend.create_scope();
    }

    /// Run one step of the program in the current scope
    pub fn step(&mut self) -> Result<(), ExecError> {
        self.backend.evaluate_step(&mut self.scope)
    }
}
