//! CUDA C renderer.
//!
//! Emits one `extern "C" __global__` function per pipeline. Each thread
//! computes a single output pixel; blocks are `tile.x × tile.y` threads and
//! out-of-range threads of edge blocks return early.
//!
//! # Kernel Signature
//!
//! ```c
//! void name(const float* input, float* output, int width, int height);
//! ```

use snafu::ensure;

use crate::error::{InvalidConstantSnafu, InvalidNameSnafu, NotGpuScheduledSnafu, Result};
use crate::pipeline::Pipeline;
use crate::traits::Renderer;
use crate::types::{BufferArg, RenderedKernel};

/// CUDA C source renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CudaRenderer;

impl CudaRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for CudaRenderer {
    fn render(&self, pipeline: &Pipeline) -> Result<RenderedKernel> {
        let name = pipeline.name.as_str();
        ensure!(is_identifier(name), InvalidNameSnafu { name });
        let tile = pipeline.schedule.tile().ok_or_else(|| NotGpuScheduledSnafu { name }.build())?;

        let scale = c_float(pipeline.expr.scale)?;
        let offset = c_float(pipeline.expr.offset)?;
        let (input, output) = (pipeline.input.as_str(), pipeline.output.as_str());

        let mut code_lines = Vec::new();

        // Function signature
        code_lines.push(format!(
            "extern \"C\" __global__ void {name}(const float* __restrict__ {input}, float* __restrict__ {output}, \
             int width, int height) {{"
        ));

        // One thread per pixel; edge blocks overhang the image.
        code_lines.push(format!("    int x = blockIdx.x * {} + threadIdx.x;", tile.x));
        code_lines.push(format!("    int y = blockIdx.y * {} + threadIdx.y;", tile.y));
        code_lines.push("    if (x >= width || y >= height) return;".to_string());
        code_lines.push("    int idx = y * width + x;".to_string());
        code_lines.push(format!("    {output}[idx] = __fadd_rn(__fmul_rn({input}[idx], {scale}), {offset});"));
        code_lines.push("}".to_string());
        code_lines.push(String::new());

        let code = code_lines.join("\n");

        tracing::debug!(
            backend = self.backend_name(),
            kernel.name = name,
            tile.x = tile.x,
            tile.y = tile.y,
            "kernel rendered"
        );

        let mut kernel = RenderedKernel::new(code, name.to_string(), name.to_string(), pipeline.expr);
        kernel.add_buffer_arg(BufferArg { index: 0, name: input.to_string(), is_output: false });
        kernel.add_buffer_arg(BufferArg { index: 1, name: output.to_string(), is_output: true });
        kernel.set_tile(tile);
        Ok(kernel)
    }

    fn backend_name(&self) -> &str {
        "cuda"
    }
}

/// Render an `f32` literal that round-trips exactly.
pub(crate) fn c_float(value: f32) -> Result<String> {
    ensure!(value.is_finite(), InvalidConstantSnafu { value });
    Ok(format!("{value:?}f"))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
