//! Accelerator backend abstraction.
//!
//! A backend is one accelerator API (CUDA, or the host-simulated virtual
//! devices used for testing). It owns three concerns:
//! - **Backend**: runtime initialization, device enumeration, context creation
//! - **Context**: per-device execution scope; owns memory and loads kernels
//! - **Program**: a kernel loaded into one context, ready to launch
//!
//! Backends are selected at runtime through [`BackendKind`], so one binary
//! can drive whichever accelerator API it was built with.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use strum::{Display, EnumString};
use tessel_codegen::{Extent, RenderedKernel};
use tracing::warn;

use crate::allocator::DeviceMemory;
use crate::error::Result;
use crate::virtual_device::VirtualBackend;

/// Identity of a live context, used for diagnostics and ownership checks.
///
/// For CUDA this is the raw `CUcontext` pointer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextHandle(usize);

impl ContextHandle {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A kernel loaded into one context.
pub trait Program: Send + Sync + fmt::Debug {
    /// Kernel name (for debugging/profiling).
    fn name(&self) -> &str;

    /// Run the kernel over `extent`, reading `input` and writing `output`.
    ///
    /// Both buffers must be owned by the context the program was loaded
    /// into and hold exactly `extent.len()` elements.
    fn execute(&self, input: &DeviceMemory, output: &mut DeviceMemory, extent: Extent) -> Result<()>;
}

/// Execution scope bound to one physical device.
///
/// Exactly one context exists per device per process; the
/// [`ContextPool`](crate::ContextPool) owns it. Dropping the last handle
/// destroys the context.
pub trait Context: Send + Sync + fmt::Debug {
    /// Logical device index, starting at 0.
    fn device_index(&self) -> usize;

    fn handle(&self) -> ContextHandle;

    /// Allocate `len` zeroed `f32` elements on the device.
    fn alloc(&self, len: usize) -> Result<DeviceMemory>;

    /// Copy host data into device memory owned by this context.
    fn upload(&self, memory: &mut DeviceMemory, src: &[f32]) -> Result<()>;

    /// Copy device memory owned by this context back to the host.
    fn download(&self, memory: &DeviceMemory, dst: &mut [f32]) -> Result<()>;

    /// Compile and load a rendered kernel into this context.
    fn load(&self, kernel: &RenderedKernel) -> Result<Arc<dyn Program>>;

    /// Wait for all queued work on this context.
    fn synchronize(&self) -> Result<()> {
        Ok(())
    }

    /// Number of device allocations made here that are still alive.
    fn live_allocations(&self) -> usize;
}

/// One accelerator API.
pub trait Backend: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Initialize the underlying runtime.
    fn init(&self) -> Result<()>;

    /// Number of physical devices visible to the runtime.
    fn device_count(&self) -> Result<usize>;

    /// Create the context for `device_index`.
    fn create_context(&self, device_index: usize) -> Result<Arc<dyn Context>>;
}

/// Backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    /// Host-simulated devices.
    Virtual,
    /// NVIDIA devices through the CUDA driver API.
    Cuda,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(feature = "cuda") { BackendKind::Cuda } else { BackendKind::Virtual }
    }
}

impl BackendKind {
    /// Backend named by a `TESSEL_BACKEND` setting.
    ///
    /// Unset or unrecognized values select the default: CUDA when compiled
    /// in, virtual devices otherwise.
    pub fn from_setting(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim) else {
            return Self::default();
        };
        BackendKind::from_str(value).unwrap_or_else(|_| {
            warn!(value, "unknown backend, using default");
            Self::default()
        })
    }

    /// Instantiate the backend. `virtual_devices` only applies to
    /// [`BackendKind::Virtual`].
    pub fn create(self, virtual_devices: usize) -> Result<Box<dyn Backend>> {
        match self {
            BackendKind::Virtual => Ok(Box::new(VirtualBackend::new(virtual_devices))),
            #[cfg(feature = "cuda")]
            BackendKind::Cuda => Ok(Box::new(crate::cuda::CudaBackend::new())),
            #[cfg(not(feature = "cuda"))]
            BackendKind::Cuda => crate::error::BackendUnavailableSnafu { backend: self.to_string() }.fail(),
        }
    }
}
