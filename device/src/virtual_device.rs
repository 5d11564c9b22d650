//! Host-simulated accelerator devices.
//!
//! Each virtual device has its own context and its own "device memory"
//! (host allocations tagged with the owning context). Memory is never shared
//! between contexts: a program refuses buffers allocated elsewhere, exactly
//! like device pointers from another CUDA context. Tiled kernels execute
//! block by block in the same order a GPU grid would be walked.

use std::sync::Arc;

use bon::bon;
use snafu::{OptionExt, ensure};
use tessel_codegen::{Extent, LaunchDims, RenderedKernel, ScaleOffsetExpr, Tile};
use tracing::debug;

use crate::allocator::{AllocationTracker, DeviceMemory, RawBuffer};
use crate::backend::{Backend, Context, ContextHandle, Program};
use crate::error::{
    BackendMismatchSnafu, CUDA_ERROR_INVALID_DEVICE, CUDA_ERROR_NOT_INITIALIZED, DeviceContextCreationFailedSnafu,
    ForeignMemorySnafu, NoRuntimeSnafu, Result, SizeMismatchSnafu,
};

/// Backend exposing `devices` host-simulated devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualBackend {
    devices: usize,
    fail_init: bool,
    fail_context: Option<usize>,
}

impl VirtualBackend {
    pub fn new(devices: usize) -> Self {
        Self { devices, fail_init: false, fail_context: None }
    }
}

impl Default for VirtualBackend {
    fn default() -> Self {
        Self::new(2)
    }
}

#[bon]
impl VirtualBackend {
    /// Create a backend with builder pattern.
    ///
    /// `fail_init` and `fail_context` inject the runtime failures a real
    /// driver can report, so startup error paths can be exercised.
    #[builder(finish_fn = build)]
    pub fn builder(
        #[builder(default = 2)] devices: usize,
        #[builder(default = false)] fail_init: bool,
        fail_context: Option<usize>,
    ) -> Self {
        Self { devices, fail_init, fail_context }
    }
}

impl Backend for VirtualBackend {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn init(&self) -> Result<()> {
        ensure!(
            !self.fail_init,
            NoRuntimeSnafu { code: CUDA_ERROR_NOT_INITIALIZED, reason: "virtual runtime configured to fail" }
        );
        Ok(())
    }

    fn device_count(&self) -> Result<usize> {
        Ok(self.devices)
    }

    fn create_context(&self, device_index: usize) -> Result<Arc<dyn Context>> {
        ensure!(
            device_index < self.devices && self.fail_context != Some(device_index),
            DeviceContextCreationFailedSnafu {
                device_index,
                code: CUDA_ERROR_INVALID_DEVICE,
                reason: "virtual device unavailable",
            }
        );
        Ok(Arc::new(VirtualContext::new(device_index)))
    }
}

/// Context of one virtual device.
#[derive(Debug)]
pub struct VirtualContext {
    device_index: usize,
    tracker: AllocationTracker,
}

impl VirtualContext {
    pub fn new(device_index: usize) -> Self {
        Self { device_index, tracker: AllocationTracker::new() }
    }

    fn check_owner(&self, memory: &DeviceMemory) -> Result<()> {
        let (owner, context) = (memory.owner(), self.handle());
        ensure!(owner == context, ForeignMemorySnafu { owner: owner.to_string(), context: context.to_string() });
        Ok(())
    }
}

impl Context for VirtualContext {
    fn device_index(&self) -> usize {
        self.device_index
    }

    fn handle(&self) -> ContextHandle {
        // Contexts live behind an `Arc`, so the address is stable for their lifetime.
        ContextHandle::from_raw(self as *const Self as usize)
    }

    fn alloc(&self, len: usize) -> Result<DeviceMemory> {
        let raw = RawBuffer::Virtual { data: vec![0.0; len].into_boxed_slice() };
        Ok(self.tracker.track(raw, self.handle()))
    }

    fn upload(&self, memory: &mut DeviceMemory, src: &[f32]) -> Result<()> {
        self.check_owner(memory)?;
        let actual = memory.raw().backend();
        let data = memory.raw_mut().as_virtual_mut().context(BackendMismatchSnafu { expected: "virtual", actual })?;
        ensure!(data.len() == src.len(), SizeMismatchSnafu { expected: data.len(), actual: src.len() });
        data.copy_from_slice(src);
        Ok(())
    }

    fn download(&self, memory: &DeviceMemory, dst: &mut [f32]) -> Result<()> {
        self.check_owner(memory)?;
        let actual = memory.raw().backend();
        let data = memory.raw().as_virtual().context(BackendMismatchSnafu { expected: "virtual", actual })?;
        ensure!(data.len() == dst.len(), SizeMismatchSnafu { expected: dst.len(), actual: data.len() });
        dst.copy_from_slice(data);
        Ok(())
    }

    fn load(&self, kernel: &RenderedKernel) -> Result<Arc<dyn Program>> {
        debug!(
            device.index = self.device_index,
            kernel.name = %kernel.name,
            tile = ?kernel.tile,
            "virtual kernel loaded"
        );
        Ok(Arc::new(VirtualProgram {
            name: kernel.name.clone(),
            expr: kernel.expr,
            tile: kernel.tile,
            owner: self.handle(),
        }))
    }

    fn live_allocations(&self) -> usize {
        self.tracker.live()
    }
}

/// Pointwise kernel evaluated on the host.
#[derive(Debug)]
pub struct VirtualProgram {
    name: String,
    expr: ScaleOffsetExpr,
    tile: Option<Tile>,
    owner: ContextHandle,
}

impl Program for VirtualProgram {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, input: &DeviceMemory, output: &mut DeviceMemory, extent: Extent) -> Result<()> {
        for memory in [input, &*output] {
            let owner = memory.owner();
            ensure!(
                owner == self.owner,
                ForeignMemorySnafu { owner: owner.to_string(), context: self.owner.to_string() }
            );
        }

        let src = input.raw().as_virtual().context(BackendMismatchSnafu { expected: "virtual", actual: "cuda" })?;
        ensure!(src.len() == extent.len(), SizeMismatchSnafu { expected: extent.len(), actual: src.len() });
        let dst =
            output.raw_mut().as_virtual_mut().context(BackendMismatchSnafu { expected: "virtual", actual: "cuda" })?;
        ensure!(dst.len() == extent.len(), SizeMismatchSnafu { expected: extent.len(), actual: dst.len() });

        match self.tile {
            Some(tile) => {
                let dims = LaunchDims::for_extent(extent, tile);
                let (tile_x, tile_y) = (tile.x as usize, tile.y as usize);
                for by in 0..dims.grid[1] as usize {
                    for bx in 0..dims.grid[0] as usize {
                        for ty in 0..tile_y {
                            for tx in 0..tile_x {
                                let (x, y) = (bx * tile_x + tx, by * tile_y + ty);
                                if x >= extent.width || y >= extent.height {
                                    continue;
                                }
                                let idx = extent.index(x, y);
                                dst[idx] = self.expr.apply(src[idx]);
                            }
                        }
                    }
                }
            }
            None => {
                for (out, &value) in dst.iter_mut().zip(src) {
                    *out = self.expr.apply(value);
                }
            }
        }
        Ok(())
    }
}
