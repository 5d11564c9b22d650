//! Types for code generation.

use snafu::OptionExt;

use crate::error::{InvalidExtentSnafu, InvalidTileSnafu, Result};

/// Width and height of a 2-D buffer, in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: usize,
    pub height: usize,
}

impl Extent {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Extent whose `f32` storage is addressable.
    ///
    /// Fails with `InvalidExtent` when `width * height` elements would
    /// overflow `usize` or exceed `isize::MAX` bytes.
    pub fn try_new(width: usize, height: usize) -> Result<Self> {
        let extent = Self { width, height };
        extent
            .checked_len()
            .and_then(|len| len.checked_mul(size_of::<f32>()))
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .context(InvalidExtentSnafu { width, height })?;
        Ok(extent)
    }

    /// Number of elements, or `None` on overflow.
    pub const fn checked_len(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }

    /// Number of elements.
    ///
    /// Extents built with [`Extent::try_new`] never overflow here.
    pub const fn len(&self) -> usize {
        self.width * self.height
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major linear index of `(x, y)`.
    pub const fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The per-pixel expression `input * scale + offset`.
///
/// Evaluation is a rounded multiply followed by a rounded add. GPU renderers
/// must emit the same two roundings (no fused multiply-add) so device output
/// is bit-identical to [`ScaleOffsetExpr::apply`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleOffsetExpr {
    pub scale: f32,
    pub offset: f32,
}

impl ScaleOffsetExpr {
    pub const fn new(scale: f32, offset: f32) -> Self {
        Self { scale, offset }
    }

    #[inline]
    pub fn apply(&self, value: f32) -> f32 {
        value * self.scale + self.offset
    }
}

/// GPU thread-block tile, in elements per block along x and y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
}

impl Tile {
    pub fn new(x: u32, y: u32) -> Result<Self> {
        snafu::ensure!(x > 0 && y > 0, InvalidTileSnafu { x, y });
        Ok(Self { x, y })
    }
}

/// Grid and block dimensions for one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchDims {
    pub grid: [u32; 3],
    pub block: [u32; 3],
}

impl LaunchDims {
    /// Cover `extent` with `tile`-sized blocks, rounding the grid up.
    pub fn for_extent(extent: Extent, tile: Tile) -> Self {
        let blocks = |len: usize, step: u32| len.div_ceil(step as usize) as u32;
        Self { grid: [blocks(extent.width, tile.x), blocks(extent.height, tile.y), 1], block: [tile.x, tile.y, 1] }
    }
}

/// Information about a buffer argument to the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferArg {
    /// Argument index.
    pub index: usize,

    /// Buffer name.
    pub name: String,

    /// Whether this is an output buffer.
    pub is_output: bool,
}

/// A rendered kernel ready for loading by a device backend.
#[derive(Debug, Clone)]
pub struct RenderedKernel {
    /// Generated CUDA C source.
    pub code: String,

    /// Entry point function name.
    pub entry_point: String,

    /// Kernel name (for debugging/caching).
    pub name: String,

    /// Buffer arguments in call order.
    pub buffer_args: Vec<BufferArg>,

    /// Expression the code computes, for backends that evaluate on the host.
    pub expr: ScaleOffsetExpr,

    /// Block tile; `None` means a plain row-major loop.
    pub tile: Option<Tile>,
}

impl RenderedKernel {
    /// Create a new rendered kernel.
    pub fn new(code: String, entry_point: String, name: String, expr: ScaleOffsetExpr) -> Self {
        Self { code, entry_point, name, buffer_args: Vec::new(), expr, tile: None }
    }

    /// Add a buffer argument.
    pub fn add_buffer_arg(&mut self, arg: BufferArg) {
        self.buffer_args.push(arg);
    }

    pub fn set_tile(&mut self, tile: Tile) {
        self.tile = Some(tile);
    }
}
