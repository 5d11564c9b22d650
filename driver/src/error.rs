use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Exit code for a verification failure.
pub const VERIFICATION_EXIT_CODE: i32 = -1;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The kernel could not be generated or rendered for the target.
    #[snafu(display("kernel generation failed: {source}"))]
    Codegen { source: tessel_codegen::Error },

    /// Backend, device enumeration or context creation failed.
    #[snafu(display("initialization failed: {source}"))]
    Init { source: tessel_device::Error },

    /// Host buffers could not be created for the configured extent.
    #[snafu(display("buffer setup failed: {source}"))]
    Buffer { source: tessel_device::Error },

    #[snafu(display("launch on device {device_index} failed: {source}"))]
    Launch { device_index: usize, source: tessel_runtime::Error },

    #[snafu(display("copy back from device {device_index} failed: {source}"))]
    CopyBack { device_index: usize, source: tessel_device::Error },

    /// An output element differs from `input * 2 + 1`.
    #[snafu(display("Error at ({x}, {y}) on device {device_index}: {expected} != {observed}"))]
    Verification { device_index: usize, x: usize, y: usize, expected: f32, observed: f32 },

    /// Buffers or contexts could not be released.
    #[snafu(display("shutdown failed: {source}"))]
    Shutdown { source: tessel_device::Error },
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Codegen { .. } | Error::Buffer { .. } => 1,
            Error::Init { source } | Error::CopyBack { source, .. } | Error::Shutdown { source } => {
                source.driver_code()
            }
            Error::Launch { source, .. } => source.driver_code(),
            Error::Verification { .. } => VERIFICATION_EXIT_CODE,
        }
    }
}
