//! Kernel launches.

use std::sync::Arc;

use snafu::{ResultExt, ensure};
use tessel_codegen::RenderedKernel;
use tessel_device::{Buffer, Context};
use tracing::trace;

use crate::error::{DeviceSnafu, ExtentMismatchSnafu, Result};
use crate::kernel_cache::KernelCache;
use crate::router::ContextHook;
use crate::selector::Selector;

/// Runs one rendered kernel on whatever context its hook picks per launch.
#[derive(Debug)]
pub struct KernelRuntime<H: ContextHook> {
    hook: H,
    kernel: RenderedKernel,
    cache: KernelCache,
}

impl<H: ContextHook> KernelRuntime<H> {
    pub fn new(hook: H, kernel: RenderedKernel) -> Self {
        Self { hook, kernel, cache: KernelCache::new() }
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    /// Number of (context, kernel) programs currently loaded.
    pub fn cached_programs(&self) -> usize {
        self.cache.len()
    }

    /// Drop every loaded program, releasing the context handles they hold.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Launch the kernel on the context `selector` routes to.
    ///
    /// The input is uploaded when its host copy is dirty or it lives on
    /// another context. On success the output's device copy is marked dirty;
    /// the caller copies it back. `release` is called after every acquire,
    /// whether or not the launch succeeded.
    pub fn launch(&mut self, selector: Option<Selector>, input: &mut Buffer, output: &mut Buffer) -> Result<()> {
        ensure!(
            input.extent() == output.extent(),
            ExtentMismatchSnafu { expected: input.extent(), actual: output.extent() }
        );

        let context = self.hook.acquire(selector)?;
        let launched = self.launch_on(&context, input, output);
        let released = self.hook.release(selector);
        launched?;
        released
    }

    fn launch_on(&mut self, context: &Arc<dyn Context>, input: &mut Buffer, output: &mut Buffer) -> Result<()> {
        if input.host_dirty() || !input.is_resident_on(context.as_ref()) {
            input.copy_to_device(context).context(DeviceSnafu)?;
        }
        output.ensure_device_allocation(context).context(DeviceSnafu)?;

        let kernel = &self.kernel;
        let program = self.cache.get_or_load(context, &kernel.name, || context.load(kernel)).context(DeviceSnafu)?;

        let extent = input.extent();
        let src = input.device_memory().context(DeviceSnafu)?;
        let dst = output.device_memory_mut().context(DeviceSnafu)?;
        program.execute(src, dst, extent).context(DeviceSnafu)?;
        output.set_device_dirty();

        trace!(device.index = context.device_index(), kernel.name = program.name(), %extent, "kernel launched");
        Ok(())
    }
}
