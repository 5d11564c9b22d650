//! Core traits for kernel generation.

use crate::{Pipeline, RenderedKernel, Result, Target};

/// Builds a pipeline (algorithm plus schedule) for a target.
///
/// Generators are registered under a stable name; the name becomes the
/// kernel entry point.
pub trait Generator {
    /// Registered generator name.
    fn name(&self) -> &str;

    /// Define the algorithm and pick a schedule for `target`.
    fn generate(&self, target: &Target) -> Result<Pipeline>;
}

/// Backend-specific code generation interface.
///
/// Implementers turn a scheduled pipeline into source a device backend can
/// compile and load.
pub trait Renderer {
    /// Render a pipeline into loadable code.
    fn render(&self, pipeline: &Pipeline) -> Result<RenderedKernel>;

    /// Get the backend name (e.g., "cuda").
    fn backend_name(&self) -> &str;
}
