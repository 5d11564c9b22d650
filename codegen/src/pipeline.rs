//! Pipeline definition and scheduling.
//!
//! A [`Pipeline`] pairs the algorithm (what every output pixel is) with a
//! [`Schedule`] (how the loops over pixels are laid out). The only
//! algorithm tessel defines is [`ScaleOffset`]:
//!
//! ```text
//! output(x, y) = input(x, y) * scale + offset
//! ```
//!
//! When the target has a GPU feature the output is tiled into `tile × tile`
//! thread blocks and computed at root; otherwise it is a plain row-major loop.

use bon::bon;

use crate::error::Result;
use crate::target::{Feature, Target};
use crate::traits::Generator;
use crate::types::{ScaleOffsetExpr, Tile};

/// Loop structure of the output stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Row-major loop over the whole output.
    Root,
    /// `x`/`y` split into blocks of `tile` with one GPU thread per pixel.
    GpuTile { tile: Tile },
}

impl Schedule {
    pub fn tile(&self) -> Option<Tile> {
        match self {
            Schedule::Root => None,
            Schedule::GpuTile { tile } => Some(*tile),
        }
    }
}

/// A scheduled pipeline ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Pipeline name; becomes the kernel entry point.
    pub name: String,
    /// Target the pipeline was generated for (always carries `user_context`).
    pub target: Target,
    pub expr: ScaleOffsetExpr,
    pub schedule: Schedule,
    /// Name of the 2-D input buffer parameter.
    pub input: String,
    /// Name of the 2-D output buffer.
    pub output: String,
}

/// Scale-and-offset generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleOffset {
    expr: ScaleOffsetExpr,
    tile: Tile,
}

impl ScaleOffset {
    /// Registered generator name.
    pub const NAME: &'static str = "multi_gpu_support";

    pub fn expr(&self) -> ScaleOffsetExpr {
        self.expr
    }
}

impl Default for ScaleOffset {
    fn default() -> Self {
        Self { expr: ScaleOffsetExpr::new(2.0, 1.0), tile: Tile { x: 16, y: 16 } }
    }
}

#[bon]
impl ScaleOffset {
    /// Create a generator with builder pattern.
    #[builder(finish_fn = build)]
    pub fn builder(
        #[builder(default = 2.0)] scale: f32,
        #[builder(default = 1.0)] offset: f32,
        #[builder(default = 16)] tile: u32,
    ) -> Result<Self> {
        Ok(Self { expr: ScaleOffsetExpr::new(scale, offset), tile: Tile::new(tile, tile)? })
    }
}

impl Generator for ScaleOffset {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&self, target: &Target) -> Result<Pipeline> {
        let mut target = target.clone();
        target.set_feature(Feature::UserContext);

        let schedule =
            if target.has_gpu_feature() { Schedule::GpuTile { tile: self.tile } } else { Schedule::Root };

        tracing::debug!(generator = Self::NAME, %target, ?schedule, "pipeline generated");

        Ok(Pipeline {
            name: self.name().to_string(),
            target,
            expr: self.expr,
            schedule,
            input: "input".to_string(),
            output: "output".to_string(),
        })
    }
}
