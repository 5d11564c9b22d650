//! Error types for kernel launches.

use snafu::Snafu;
use tessel_codegen::Extent;

use crate::selector::Selector;

/// Result type for runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while routing or launching a kernel.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The selector does not name a device held by the pool.
    #[snafu(display("selector {selector} does not name a device in the pool"))]
    UnknownSelector { selector: Selector },

    /// Device-side failure (transfer, load or execution).
    #[snafu(display("device error: {source}"))]
    Device { source: tessel_device::Error },

    /// Input and output buffers disagree on shape.
    #[snafu(display("output extent {actual} does not match input extent {expected}"))]
    ExtentMismatch { expected: Extent, actual: Extent },
}

impl Error {
    /// Driver-style status code for this error.
    pub fn driver_code(&self) -> i32 {
        match self {
            Error::Device { source } => source.driver_code(),
            Error::UnknownSelector { .. } | Error::ExtentMismatch { .. } => 1,
        }
    }
}
