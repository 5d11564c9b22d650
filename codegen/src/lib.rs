//! Kernel generation for tessel.
//!
//! This crate describes the one pipeline tessel ships, a per-pixel
//! scale-and-offset over a 2-D `f32` buffer, and lowers it into a form the
//! device backends can load.
//!
//! # Architecture
//!
//! - **Target**: architecture plus feature set (`host-cuda-user_context`)
//! - **Generator**: builds a [`Pipeline`] (algorithm + schedule) for a target
//! - **Renderer**: turns a pipeline into a [`RenderedKernel`] (CUDA C today)
//!
//! # Usage
//!
//! ```ignore
//! use tessel_codegen::{CudaRenderer, Generator, Renderer, ScaleOffset, Target};
//!
//! let target: Target = "host-cuda".parse()?;
//! let pipeline = ScaleOffset::default().generate(&target)?;
//! let kernel = CudaRenderer::new().render(&pipeline)?;
//! ```

pub mod cuda;
pub mod error;
pub mod pipeline;
pub mod target;
pub mod traits;
pub mod types;


pub use cuda::CudaRenderer;
pub use error::*;
pub use pipeline::{Pipeline, ScaleOffset, Schedule};
pub use target::{Arch, Feature, Target};
pub use traits::*;
pub use types::*;
