//! Device layer for tessel.
//!
//! - [`backend`]: `Backend` / `Context` / `Program` traits and backend selection
//! - [`virtual_device`]: host-simulated devices (always available)
//! - `cuda`: CUDA driver API backend (feature `cuda`)
//! - [`buffer`]: host/device dual-resident 2-D buffers
//! - [`pool`]: one context per device, owned for the process lifetime

pub mod allocator;
pub mod backend;
pub mod buffer;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod error;
pub mod pool;
pub mod virtual_device;

#[cfg(test)]
pub mod test;

pub use allocator::{AllocationTracker, DeviceMemory, RawBuffer};
pub use backend::{Backend, BackendKind, Context, ContextHandle, Program};
pub use buffer::Buffer;
#[cfg(feature = "cuda")]
pub use cuda::CudaBackend;
pub use error::*;
pub use pool::ContextPool;
pub use virtual_device::{VirtualBackend, VirtualContext};
