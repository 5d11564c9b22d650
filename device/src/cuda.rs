//! CUDA backend over the driver API.
//!
//! Contexts are the devices' primary contexts (`cuDevicePrimaryCtxRetain`),
//! retained once per device by the pool and released when the last handle
//! drops. Kernels are compiled from CUDA C with NVRTC and launched on the
//! context's default stream.

use std::fmt;
use std::panic::{self, UnwindSafe};
use std::sync::Arc;

use cudarc::driver::{CudaContext, CudaFunction, CudaStream, LaunchConfig, PushKernelArg};
use snafu::{OptionExt, ResultExt, ensure};
use tessel_codegen::{Extent, LaunchDims, RenderedKernel, Tile};
use tracing::debug;

use crate::allocator::{AllocationTracker, DeviceMemory, RawBuffer};
use crate::backend::{Backend, Context, ContextHandle, Program};
use crate::error::{
    BackendMismatchSnafu, CUDA_ERROR_NOT_INITIALIZED, CompileSnafu, CudaSnafu, DeviceContextCreationFailedSnafu,
    ExtentTooLargeSnafu, ForeignMemorySnafu, NoRuntimeSnafu, NotGpuScheduledSnafu, Result, SizeMismatchSnafu,
};

/// Run the first driver call, turning a failed library load into `NoRuntime`.
///
/// With dynamic loading, cudarc panics when `libcuda` cannot be opened
/// instead of returning a driver status.
pub(crate) fn guard_driver_load<T>(call: impl FnOnce() -> Result<T> + UnwindSafe) -> Result<T> {
    panic::catch_unwind(call).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&str>().copied())
            .unwrap_or("CUDA driver library could not be loaded")
            .to_string();
        NoRuntimeSnafu { code: CUDA_ERROR_NOT_INITIALIZED, reason }.fail()
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CudaBackend;

impl CudaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for CudaBackend {
    fn name(&self) -> &'static str {
        "cuda"
    }

    fn init(&self) -> Result<()> {
        guard_driver_load(|| {
            cudarc::driver::result::init()
                .map_err(|e| NoRuntimeSnafu { code: e.0 as i32, reason: e.to_string() }.build())
        })
    }

    fn device_count(&self) -> Result<usize> {
        let count = CudaContext::device_count().context(CudaSnafu)?;
        Ok(count.max(0) as usize)
    }

    fn create_context(&self, device_index: usize) -> Result<Arc<dyn Context>> {
        let context = CudaContext::new(device_index).map_err(|e| {
            DeviceContextCreationFailedSnafu { device_index, code: e.0 as i32, reason: e.to_string() }.build()
        })?;
        let stream = context.default_stream();
        Ok(Arc::new(CudaDeviceContext { device_index, context, stream, tracker: AllocationTracker::new() }))
    }
}

/// Context of one CUDA device.
pub struct CudaDeviceContext {
    device_index: usize,
    context: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    tracker: AllocationTracker,
}

impl fmt::Debug for CudaDeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CudaDeviceContext")
            .field("device_index", &self.device_index)
            .field("handle", &self.handle())
            .field("live_allocations", &self.tracker.live())
            .finish()
    }
}

impl CudaDeviceContext {
    fn check_owner(&self, memory: &DeviceMemory) -> Result<()> {
        let (owner, context) = (memory.owner(), self.handle());
        ensure!(owner == context, ForeignMemorySnafu { owner: owner.to_string(), context: context.to_string() });
        Ok(())
    }
}

impl Context for CudaDeviceContext {
    fn device_index(&self) -> usize {
        self.device_index
    }

    fn handle(&self) -> ContextHandle {
        ContextHandle::from_raw(self.context.cu_ctx() as usize)
    }

    fn alloc(&self, len: usize) -> Result<DeviceMemory> {
        let data = self.stream.alloc_zeros::<f32>(len).context(CudaSnafu)?;
        Ok(self.tracker.track(RawBuffer::Cuda { data }, self.handle()))
    }

    fn upload(&self, memory: &mut DeviceMemory, src: &[f32]) -> Result<()> {
        self.check_owner(memory)?;
        let actual = memory.raw().backend();
        let data = memory.raw_mut().as_cuda_mut().context(BackendMismatchSnafu { expected: "cuda", actual })?;
        ensure!(data.len() == src.len(), SizeMismatchSnafu { expected: data.len(), actual: src.len() });
        self.stream.memcpy_htod(src, data).context(CudaSnafu)
    }

    fn download(&self, memory: &DeviceMemory, dst: &mut [f32]) -> Result<()> {
        self.check_owner(memory)?;
        let actual = memory.raw().backend();
        let data = memory.raw().as_cuda().context(BackendMismatchSnafu { expected: "cuda", actual })?;
        ensure!(data.len() == dst.len(), SizeMismatchSnafu { expected: dst.len(), actual: data.len() });
        self.stream.memcpy_dtoh(data, dst).context(CudaSnafu)?;
        self.stream.synchronize().context(CudaSnafu)
    }

    fn load(&self, kernel: &RenderedKernel) -> Result<Arc<dyn Program>> {
        let tile = kernel.tile.context(NotGpuScheduledSnafu { name: kernel.name.as_str() })?;
        let ptx =
            cudarc::nvrtc::compile_ptx(&kernel.code).map_err(|e| CompileSnafu { reason: format!("{e:?}") }.build())?;
        let module = self.context.load_module(ptx).context(CudaSnafu)?;
        let function = module.load_function(&kernel.entry_point).context(CudaSnafu)?;

        debug!(device.index = self.device_index, kernel.name = %kernel.name, "cuda kernel loaded");

        Ok(Arc::new(CudaProgram {
            name: kernel.name.clone(),
            function,
            stream: Arc::clone(&self.stream),
            tile,
            owner: self.handle(),
        }))
    }

    fn synchronize(&self) -> Result<()> {
        self.stream.synchronize().context(CudaSnafu)
    }

    fn live_allocations(&self) -> usize {
        self.tracker.live()
    }
}

/// NVRTC-compiled kernel bound to one context.
pub struct CudaProgram {
    name: String,
    function: CudaFunction,
    stream: Arc<CudaStream>,
    tile: Tile,
    owner: ContextHandle,
}

impl fmt::Debug for CudaProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CudaProgram").field("name", &self.name).field("tile", &self.tile).finish()
    }
}

impl Program for CudaProgram {
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

        let too_large = || ExtentTooLargeSnafu { extent, limit: i32::MAX as usize }.build();
        let width = i32::try_from(extent.width).map_err(|_| too_large())?;
        let height = i32::try_from(extent.height).map_err(|_| too_large())?;

        let src = input.raw().as_cuda().context(BackendMismatchSnafu { expected: "cuda", actual: "virtual" })?;
        ensure!(src.len() == extent.len(), SizeMismatchSnafu { expected: extent.len(), actual: src.len() });
        let dst =
            output.raw_mut().as_cuda_mut().context(BackendMismatchSnafu { expected: "cuda", actual: "virtual" })?;
        ensure!(dst.len() == extent.len(), SizeMismatchSnafu { expected: extent.len(), actual: dst.len() });

        let dims = LaunchDims::for_extent(extent, self.tile);
        let config = LaunchConfig {
            grid_dim: (dims.grid[0], dims.grid[1], dims.grid[2]),
            block_dim: (dims.block[0], dims.block[1], dims.block[2]),
            shared_mem_bytes: 0,
        };

        let mut launch = self.stream.launch_builder(&self.function);
        launch.arg(src).arg(dst).arg(&width).arg(&height);
        // SAFETY: argument order and types match the rendered signature
        // (const float*, float*, int, int), and both slices hold extent.len() elements.
        unsafe { launch.launch(config) }.context(CudaSnafu)?;
        Ok(())
    }
}
