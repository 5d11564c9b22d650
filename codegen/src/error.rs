//! Error types for kernel generation.

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while generating or rendering a kernel.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Target string could not be parsed.
    #[snafu(display("invalid target '{target}': {reason}"))]
    InvalidTarget { target: String, reason: String },

    /// Kernel name is not a valid C identifier.
    #[snafu(display("invalid kernel name '{name}'"))]
    InvalidName { name: String },

    /// A constant of the expression cannot be represented in generated code.
    #[snafu(display("constant {value} cannot be rendered"))]
    InvalidConstant { value: f32 },

    /// Element count of a 2-D extent does not fit in memory.
    #[snafu(display("extent {width}x{height} is too large"))]
    InvalidExtent { width: usize, height: usize },

    /// Tile dimensions must be non-zero.
    #[snafu(display("invalid tile {x}x{y}"))]
    InvalidTile { x: u32, y: u32 },

    /// Renderer requires a GPU schedule but the pipeline was scheduled for the host.
    #[snafu(display("pipeline '{name}' has no GPU schedule"))]
    NotGpuScheduled { name: String },
}
