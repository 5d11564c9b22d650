pub mod unit;

use tessel_codegen::{CudaRenderer, Feature, Generator, RenderedKernel, Renderer, ScaleOffset, Target};

/// The 16×16-tiled scale-and-offset kernel.
pub(crate) fn tiled_kernel() -> RenderedKernel {
    let pipeline = ScaleOffset::default().generate(&Target::host().with_feature(Feature::Cuda)).unwrap();
    CudaRenderer::new().render(&pipeline).unwrap()
}
