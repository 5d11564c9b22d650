use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "cuda")]
use cudarc::driver::CudaSlice;

use crate::backend::ContextHandle;

/// Opaque handle to device memory.
#[derive(Debug)]
pub enum RawBuffer {
    /// Host-simulated device memory.
    Virtual { data: Box<[f32]> },
    #[cfg(feature = "cuda")]
    Cuda { data: CudaSlice<f32> },
}

impl RawBuffer {
    /// Number of `f32` elements.
    pub fn len(&self) -> usize {
        match self {
            RawBuffer::Virtual { data } => data.len(),
            #[cfg(feature = "cuda")]
            RawBuffer::Cuda { data } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the backend that owns this memory.
    pub fn backend(&self) -> &'static str {
        match self {
            RawBuffer::Virtual { .. } => "virtual",
            #[cfg(feature = "cuda")]
            RawBuffer::Cuda { .. } => "cuda",
        }
    }

    pub fn as_virtual(&self) -> Option<&[f32]> {
        match self {
            RawBuffer::Virtual { data } => Some(&data[..]),
            #[cfg(feature = "cuda")]
            RawBuffer::Cuda { .. } => None,
        }
    }

    pub fn as_virtual_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            RawBuffer::Virtual { data } => Some(&mut data[..]),
            #[cfg(feature = "cuda")]
            RawBuffer::Cuda { .. } => None,
        }
    }

    #[cfg(feature = "cuda")]
    pub fn as_cuda(&self) -> Option<&CudaSlice<f32>> {
        match self {
            RawBuffer::Cuda { data } => Some(data),
            RawBuffer::Virtual { .. } => None,
        }
    }

    #[cfg(feature = "cuda")]
    pub fn as_cuda_mut(&mut self) -> Option<&mut CudaSlice<f32>> {
        match self {
            RawBuffer::Cuda { data } => Some(data),
            RawBuffer::Virtual { .. } => None,
        }
    }
}

/// Counts the device allocations a context has handed out.
///
/// Every [`DeviceMemory`] carries a lease on its context's tracker; the
/// lease is returned when the memory is dropped. The pool reads
/// [`AllocationTracker::live`] to refuse shutdown while memory is resident.
#[derive(Debug, Clone, Default)]
pub struct AllocationTracker {
    live: Arc<AtomicUsize>,
}

impl AllocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocations not yet dropped.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Wrap freshly allocated memory owned by `owner`.
    pub fn track(&self, raw: RawBuffer, owner: ContextHandle) -> DeviceMemory {
        self.live.fetch_add(1, Ordering::AcqRel);
        DeviceMemory { raw, owner, _lease: Lease { live: Arc::clone(&self.live) } }
    }
}

#[derive(Debug)]
struct Lease {
    live: Arc<AtomicUsize>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Device memory owned by one context.
///
/// Dropping the value frees the memory and returns its lease.
#[derive(Debug)]
pub struct DeviceMemory {
    raw: RawBuffer,
    owner: ContextHandle,
    _lease: Lease,
}

impl DeviceMemory {
    pub fn raw(&self) -> &RawBuffer {
        &self.raw
    }

    pub fn raw_mut(&mut self) -> &mut RawBuffer {
        &mut self.raw
    }

    /// Context the memory was allocated on.
    pub fn owner(&self) -> ContextHandle {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}
