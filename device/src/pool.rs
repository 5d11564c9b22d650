//! Device context pool.
//!
//! The pool opens one context per device at startup and owns them until
//! [`ContextPool::shutdown`]. The context table is written once in
//! [`ContextPool::initialize`] and only read afterwards, so lookups take no
//! lock.
//!
//! # Shutdown ordering
//!
//! Every device allocation must be released before its context is
//! destroyed. `shutdown` checks this instead of trusting the caller: it
//! refuses while any context still has live allocations or while any other
//! handle to a context (a buffer, a cached program) is alive. A refused
//! shutdown leaves the pool untouched so the caller can release and retry.

use std::sync::Arc;

use snafu::{OptionExt, ensure};
use tracing::{info, warn};

use crate::backend::{Backend, Context};
use crate::error::{
    BuffersStillResidentSnafu, ContextInUseSnafu, DeviceContextCreationFailedSnafu, Error, InsufficientDevicesSnafu,
    NoRuntimeSnafu, Result, UnknownDeviceSnafu,
};

#[derive(Debug)]
pub struct ContextPool {
    backend: &'static str,
    contexts: Vec<Arc<dyn Context>>,
}

impl ContextPool {
    /// Number of devices the multi-device driver routes between.
    pub const DEFAULT_REQUIRED_DEVICES: usize = 2;

    /// Initialize the runtime and open contexts for devices `0..required`.
    ///
    /// # Errors
    ///
    /// - `NoRuntime` if the backend runtime cannot initialize
    /// - `InsufficientDevices` if fewer than `required` devices are present
    /// - `DeviceContextCreationFailed` naming the first device that failed;
    ///   contexts already opened are destroyed before returning
    pub fn initialize(backend: &dyn Backend, required: usize) -> Result<Self> {
        backend.init().map_err(|e| match e {
            e @ Error::NoRuntime { .. } => e,
            other => NoRuntimeSnafu { code: other.driver_code(), reason: other.to_string() }.build(),
        })?;

        let available = backend.device_count()?;
        info!(backend = backend.name(), count = available, "device count");
        ensure!(available >= required, InsufficientDevicesSnafu { required, available });

        let mut contexts = Vec::with_capacity(required);
        for device_index in 0..required {
            let context = backend.create_context(device_index).map_err(|e| match e {
                e @ Error::DeviceContextCreationFailed { .. } => e,
                other => DeviceContextCreationFailedSnafu {
                    device_index,
                    code: other.driver_code(),
                    reason: other.to_string(),
                }
                .build(),
            })?;
            info!(device.index = device_index, context = %context.handle(), "created context");
            contexts.push(context);
        }

        Ok(Self { backend: backend.name(), contexts })
    }

    /// Context held for `device_index`.
    pub fn get(&self, device_index: usize) -> Result<&Arc<dyn Context>> {
        self.contexts.get(device_index).context(UnknownDeviceSnafu { device_index })
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Number of live contexts (0 after shutdown).
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Arc<dyn Context>> {
        self.contexts.iter()
    }

    /// Destroy every context, exactly once.
    ///
    /// Calling this again after a successful shutdown does nothing.
    pub fn shutdown(&mut self) -> Result<()> {
        for context in &self.contexts {
            let device_index = context.device_index();
            let count = context.live_allocations();
            ensure!(count == 0, BuffersStillResidentSnafu { device_index, count });
            let handles = Arc::strong_count(context) - 1;
            ensure!(handles == 0, ContextInUseSnafu { device_index, handles });
        }

        for context in self.contexts.drain(..) {
            if let Err(e) = context.synchronize() {
                warn!(device.index = context.device_index(), error = %e, "synchronize before destroy failed");
            }
            info!(device.index = context.device_index(), context = %context.handle(), "destroying context");
        }
        Ok(())
    }
}

impl Drop for ContextPool {
    fn drop(&mut self) {
        if !self.contexts.is_empty() {
            warn!(contexts = self.contexts.len(), "context pool dropped without shutdown");
        }
    }
}
