//! Per-launch context routing.
//!
//! The runtime calls [`ContextHook::acquire`] once before every launch, on the
//! launching thread, and [`ContextHook::release`] once after it (also when the
//! launch failed). Whatever context `acquire` returns is the one every
//! transfer and the execution of that launch use.

use std::sync::Arc;

use snafu::{OptionExt, ResultExt};
use tessel_device::{Context, ContextPool};
use tracing::info;

use crate::error::{DeviceSnafu, Result, UnknownSelectorSnafu};
use crate::selector::Selector;

/// Acquire/release hook consulted by [`KernelRuntime`](crate::KernelRuntime).
pub trait ContextHook {
    /// Context the next launch must run on.
    fn acquire(&self, selector: Option<Selector>) -> Result<Arc<dyn Context>>;

    /// Called after the launch that `acquire` was called for.
    fn release(&self, selector: Option<Selector>) -> Result<()>;
}

/// Routes selector `n` to device `n - 1` of a borrowed [`ContextPool`].
///
/// A launch without a selector runs on device 0. Selectors outside the
/// pool's device set are refused rather than folded onto some device.
#[derive(Debug, Clone, Copy)]
pub struct ContextRouter<'pool> {
    pool: &'pool ContextPool,
}

impl<'pool> ContextRouter<'pool> {
    pub fn new(pool: &'pool ContextPool) -> Self {
        Self { pool }
    }

    /// Context `selector` routes to, without taking a handle.
    pub fn resolve(&self, selector: Option<Selector>) -> Result<&'pool Arc<dyn Context>> {
        let Some(selector) = selector else {
            info!("no selector supplied, defaulting to device 0");
            return self.pool.get(0).context(DeviceSnafu);
        };

        let device_index = selector.device_index().context(UnknownSelectorSnafu { selector })?;
        self.pool.get(device_index).map_err(|_| UnknownSelectorSnafu { selector }.build())
    }
}

impl ContextHook for ContextRouter<'_> {
    fn acquire(&self, selector: Option<Selector>) -> Result<Arc<dyn Context>> {
        let context = self.resolve(selector)?;
        info!(
            selector = ?selector.map(Selector::tag),
            device.index = context.device_index(),
            context = %context.handle(),
            "context acquired"
        );
        Ok(Arc::clone(context))
    }

    fn release(&self, _selector: Option<Selector>) -> Result<()> {
        // Launches are sequential and the pool outlives every launch.
        Ok(())
    }
}
