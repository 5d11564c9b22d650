//! The alternating launch loop and its verification.

use snafu::ResultExt;
use tessel_codegen::{CudaRenderer, Generator, Renderer, ScaleOffset, ScaleOffsetExpr};
use tessel_device::{Buffer, ContextPool};
use tessel_runtime::{ContextRouter, KernelRuntime, Selector};
use tracing::{debug, error, info, warn};

use crate::config::DriverConfig;
use crate::error::{
    BufferSnafu, CodegenSnafu, CopyBackSnafu, InitSnafu, LaunchSnafu, Result, ShutdownSnafu, VerificationSnafu,
};

/// Input element `(x, y)`.
pub fn input_value(x: usize, y: usize) -> f32 {
    (x * y) as f32
}

/// Launches the kernel on every pooled device in turn, one output per device.
///
/// Borrows the pool for its whole lifetime; the pool can only be shut down
/// after [`Driver::release`] has freed every device buffer and dropped the
/// runtime.
#[derive(Debug)]
pub struct Driver<'pool> {
    runtime: KernelRuntime<ContextRouter<'pool>>,
    expr: ScaleOffsetExpr,
    input: Buffer,
    outputs: Vec<Buffer>,
}

impl<'pool> Driver<'pool> {
    /// Generate and render the kernel for `config.target` and allocate the
    /// host buffers: one shared input, one output per pooled device.
    pub fn new(pool: &'pool ContextPool, config: &DriverConfig) -> Result<Self> {
        let generator = ScaleOffset::default();
        let pipeline = generator.generate(&config.target).context(CodegenSnafu)?;
        let kernel = CudaRenderer::new().render(&pipeline).context(CodegenSnafu)?;
        debug!(kernel.name = %kernel.name, target = %pipeline.target, tile = ?kernel.tile, "kernel rendered");

        let input = Buffer::from_fn(config.width, config.height, input_value).context(BufferSnafu)?;
        let outputs = (0..pool.len())
            .map(|_| Buffer::new(config.width, config.height))
            .collect::<tessel_device::Result<Vec<_>>>()
            .context(BufferSnafu)?;

        let runtime = KernelRuntime::new(ContextRouter::new(pool), kernel);
        Ok(Self { runtime, expr: generator.expr(), input, outputs })
    }

    pub fn input(&self) -> &Buffer {
        &self.input
    }

    pub fn outputs(&self) -> &[Buffer] {
        &self.outputs
    }

    pub fn outputs_mut(&mut self) -> &mut [Buffer] {
        &mut self.outputs
    }

    /// Run `iterations` rounds. Each round, for every device in selector
    /// order: mark the input host-dirty, launch, copy the output back.
    pub fn run(&mut self, iterations: usize) -> Result<()> {
        for iteration in 0..iterations {
            for (device_index, output) in self.outputs.iter_mut().enumerate() {
                let selector = Selector::for_device(device_index);
                self.input.set_host_dirty();
                self.runtime.launch(selector, &mut self.input, output).context(LaunchSnafu { device_index })?;
                output.copy_to_host().context(CopyBackSnafu { device_index })?;
            }
            if iteration % 100 == 0 {
                debug!(iteration, iterations, "launch round complete");
            }
        }
        info!(iterations, devices = self.outputs.len(), "launches complete");
        Ok(())
    }

    /// Compare every output element with the host reference, bit for bit.
    ///
    /// Row-major scan; at each coordinate the outputs are checked in device
    /// order. The first mismatch is reported.
    pub fn verify(&self) -> Result<()> {
        let extent = self.input.extent();
        for y in 0..extent.height {
            for x in 0..extent.width {
                let expected = self.expr.apply(self.input[(x, y)]);
                for (device_index, output) in self.outputs.iter().enumerate() {
                    let observed = output[(x, y)];
                    if observed.to_bits() != expected.to_bits() {
                        error!(device.index = device_index, x, y, expected, observed, "output mismatch");
                        return VerificationSnafu { device_index, x, y, expected, observed }.fail();
                    }
                }
            }
        }
        info!(devices = self.outputs.len(), %extent, "outputs verified");
        Ok(())
    }

    /// Free every device allocation, then drop the runtime and its cached
    /// programs.
    pub fn release(mut self) -> Result<()> {
        self.input.device_free().context(ShutdownSnafu)?;
        for output in &mut self.outputs {
            output.device_free().context(ShutdownSnafu)?;
        }
        self.runtime.clear_cache();
        debug!("device buffers released");
        Ok(())
    }
}

/// Whole program: open the pool, run, verify, tear down.
pub fn run(config: &DriverConfig) -> Result<()> {
    info!(iterations = config.iterations, backend = %config.backend, "starting");

    let backend = config.backend.create(config.devices).context(InitSnafu)?;
    let mut pool =
        ContextPool::initialize(backend.as_ref(), ContextPool::DEFAULT_REQUIRED_DEVICES).context(InitSnafu)?;

    run_on(&mut pool, config)?;
    info!("Success!");
    Ok(())
}

/// Run and verify on an open pool, then shut it down.
///
/// Buffers are freed, the runtime dropped and the pool shut down even when
/// the launch loop or the verification fails; the first error is returned.
pub fn run_on(pool: &mut ContextPool, config: &DriverConfig) -> Result<()> {
    let outcome = Driver::new(pool, config).and_then(|mut driver| {
        let checked = driver.run(config.iterations).and_then(|()| driver.verify());
        let released = driver.release();
        checked.and(released)
    });
    let shutdown = pool.shutdown().context(ShutdownSnafu);

    if let (Err(_), Err(masked)) = (&outcome, &shutdown) {
        warn!(error = %masked, "context shutdown failed after an earlier error");
    }
    outcome?;
    shutdown
}
