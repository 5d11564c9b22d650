use std::ops::{Index, IndexMut};
use std::sync::Arc;

use snafu::{OptionExt, ResultExt, ensure};
use tessel_codegen::Extent;
use tracing::{debug, trace, warn};

use crate::allocator::DeviceMemory;
use crate::backend::Context;
use crate::error::{DirtyConflictSnafu, InvalidExtentSnafu, NotAllocatedSnafu, Result, StaleHostSnafu};

/// Device allocation together with the context that owns it.
#[derive(Debug)]
struct Resident {
    memory: DeviceMemory,
    context: Arc<dyn Context>,
}

/// A host/device dual-resident 2-D `f32` buffer.
///
/// The host copy is always present. A device copy exists once the buffer has
/// been transferred to (or allocated on) a context and lives until
/// [`Buffer::device_free`] or drop. Two flags track which side is newer:
///
/// - `host_dirty`: the host copy changed and must be uploaded before use
/// - `device_dirty`: a kernel wrote the device copy; download before reading
///
/// A device copy belongs to exactly one context. Moving the buffer to another
/// context frees the old allocation first, which is only allowed while the
/// host copy is current.
#[derive(Debug)]
pub struct Buffer {
    extent: Extent,
    host: Vec<f32>,
    device: Option<Resident>,
    host_dirty: bool,
    device_dirty: bool,
}

impl Buffer {
    /// Zero-filled buffer of `width × height` elements.
    ///
    /// Fails with `InvalidExtent` when the element count overflows.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let extent = Extent::try_new(width, height).context(InvalidExtentSnafu)?;
        Ok(Self { extent, host: vec![0.0; extent.len()], device: None, host_dirty: false, device_dirty: false })
    }

    /// Buffer whose element `(x, y)` is `f(x, y)`.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Result<Self> {
        let mut buffer = Self::new(width, height)?;
        for y in 0..height {
            for x in 0..width {
                buffer[(x, y)] = f(x, y);
            }
        }
        Ok(buffer)
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn len(&self) -> usize {
        self.extent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extent.is_empty()
    }

    /// Host copy in row-major order.
    pub fn host(&self) -> &[f32] {
        &self.host
    }

    /// Mutable host copy. Callers that change it must [`set_host_dirty`](Self::set_host_dirty).
    pub fn host_mut(&mut self) -> &mut [f32] {
        &mut self.host
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.extent.width && y < self.extent.height).then(|| self.host[self.extent.index(x, y)])
    }

    pub fn host_dirty(&self) -> bool {
        self.host_dirty
    }

    pub fn device_dirty(&self) -> bool {
        self.device_dirty
    }

    /// Mark the host copy as newer than any device copy.
    pub fn set_host_dirty(&mut self) {
        self.host_dirty = true;
    }

    /// Mark the device copy as newer than the host copy.
    pub fn set_device_dirty(&mut self) {
        self.device_dirty = true;
    }

    pub fn is_device_resident(&self) -> bool {
        self.device.is_some()
    }

    /// Device index of the current allocation, if any.
    pub fn device_index(&self) -> Option<usize> {
        self.device.as_ref().map(|resident| resident.context.device_index())
    }

    pub fn is_resident_on(&self, context: &dyn Context) -> bool {
        self.device.as_ref().is_some_and(|resident| resident.memory.owner() == context.handle())
    }

    pub fn device_memory(&self) -> Result<&DeviceMemory> {
        self.device.as_ref().map(|resident| &resident.memory).context(NotAllocatedSnafu)
    }

    pub fn device_memory_mut(&mut self) -> Result<&mut DeviceMemory> {
        self.device.as_mut().map(|resident| &mut resident.memory).context(NotAllocatedSnafu)
    }

    /// Make sure a device allocation exists on `context`, without copying data.
    ///
    /// An allocation on another context is freed first; this fails with
    /// `StaleHost` if that allocation holds the only current copy.
    pub fn ensure_device_allocation(&mut self, context: &Arc<dyn Context>) -> Result<()> {
        if let Some(resident) = &self.device {
            if resident.memory.owner() == context.handle() {
                return Ok(());
            }
            let from = resident.context.device_index();
            ensure!(!self.device_dirty, StaleHostSnafu { device_index: from });
            debug!(from.device = from, to.device = context.device_index(), "moving device allocation");
            self.device = None;
        }

        let memory = context.alloc(self.extent.len())?;
        self.device = Some(Resident { memory, context: Arc::clone(context) });
        Ok(())
    }

    /// Upload the host copy to `context`, allocating there if needed.
    pub fn copy_to_device(&mut self, context: &Arc<dyn Context>) -> Result<()> {
        ensure!(!(self.host_dirty && self.device_dirty), DirtyConflictSnafu);
        self.ensure_device_allocation(context)?;

        let resident = self.device.as_mut().context(NotAllocatedSnafu)?;
        resident.context.upload(&mut resident.memory, &self.host)?;
        self.host_dirty = false;

        trace!(device.index = context.device_index(), len = self.host.len(), "copied to device");
        Ok(())
    }

    /// Download the device copy if it is newer than the host copy.
    pub fn copy_to_host(&mut self) -> Result<()> {
        if !self.device_dirty {
            return Ok(());
        }
        ensure!(!self.host_dirty, DirtyConflictSnafu);

        let resident = self.device.as_ref().context(NotAllocatedSnafu)?;
        resident.context.download(&resident.memory, &mut self.host)?;
        self.device_dirty = false;

        trace!(device.index = resident.context.device_index(), len = self.host.len(), "copied to host");
        Ok(())
    }

    /// Release the device allocation, if any.
    ///
    /// A dirty device copy is discarded.
    pub fn device_free(&mut self) -> Result<()> {
        let Some(resident) = self.device.take() else {
            return Ok(());
        };
        if self.device_dirty {
            warn!(device.index = resident.context.device_index(), "freeing device copy that was never copied back");
            self.device_dirty = false;
        }
        resident.context.synchronize()?;
        debug!(device.index = resident.context.device_index(), "device allocation freed");
        Ok(())
    }
}

impl Index<(usize, usize)> for Buffer {
    type Output = f32;

    fn index(&self, (x, y): (usize, usize)) -> &f32 {
        assert!(x < self.extent.width && y < self.extent.height, "({x}, {y}) out of bounds for {}", self.extent);
        &self.host[self.extent.index(x, y)]
    }
}

impl IndexMut<(usize, usize)> for Buffer {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut f32 {
        assert!(x < self.extent.width && y < self.extent.height, "({x}, {y}) out of bounds for {}", self.extent);
        &mut self.host[self.extent.index(x, y)]
    }
}
