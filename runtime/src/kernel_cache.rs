//! Loaded-program cache.
//!
//! Maps (context, kernel name) pairs to programs loaded on that context, so a
//! kernel is compiled and loaded once per device rather than once per launch.
//! Each entry keeps a handle to its context: the pool cannot destroy a
//! context while a program loaded on it is still cached.

use std::collections::HashMap;
use std::sync::Arc;

use tessel_device::{Context, ContextHandle, Program};
use tracing::debug;

/// Cached program together with the context it was loaded on.
#[derive(Debug)]
pub struct CachedProgram {
    pub program: Arc<dyn Program>,
    pub context: Arc<dyn Context>,
}

/// Cache key: (context handle, kernel name).
type ProgramKey = (ContextHandle, String);

#[derive(Debug, Default)]
pub struct KernelCache {
    programs: HashMap<ProgramKey, CachedProgram>,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the program for `name` on `context`, loading it with `load_fn` on a miss.
    pub fn get_or_load<F, E>(
        &mut self,
        context: &Arc<dyn Context>,
        name: &str,
        load_fn: F,
    ) -> Result<Arc<dyn Program>, E>
    where
        F: FnOnce() -> Result<Arc<dyn Program>, E>,
    {
        let key = (context.handle(), name.to_string());
        if let Some(cached) = self.programs.get(&key) {
            return Ok(Arc::clone(&cached.program));
        }

        let program = load_fn()?;
        debug!(device.index = context.device_index(), kernel.name = name, "program cached");
        self.programs.insert(key, CachedProgram { program: Arc::clone(&program), context: Arc::clone(context) });
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Drop every cached program and its context handle.
    pub fn clear(&mut self) {
        self.programs.clear();
    }
}
