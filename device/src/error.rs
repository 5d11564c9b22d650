use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Driver status reported when the compute runtime failed to initialize.
pub const CUDA_ERROR_NOT_INITIALIZED: i32 = 3;
/// Driver status reported when no usable device is present.
pub const CUDA_ERROR_NO_DEVICE: i32 = 100;
/// Driver status reported for an out-of-range device ordinal.
pub const CUDA_ERROR_INVALID_DEVICE: i32 = 101;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The underlying compute runtime could not be initialized.
    #[snafu(display("compute runtime unavailable (code {code}): {reason}"))]
    NoRuntime { code: i32, reason: String },

    /// Fewer devices are present than the pool was asked to open.
    #[snafu(display("{required} devices required, {available} available"))]
    InsufficientDevices { required: usize, available: usize },

    /// Context creation failed for one device.
    #[snafu(display("failed to create context on device {device_index} (code {code}): {reason}"))]
    DeviceContextCreationFailed { device_index: usize, code: i32, reason: String },

    /// Backend was requested but is not compiled in.
    #[snafu(display("backend '{backend}' is not available in this build"))]
    BackendUnavailable { backend: String },

    /// No context is held for this device index.
    #[snafu(display("device {device_index} is not initialized"))]
    UnknownDevice { device_index: usize },

    /// Shutdown attempted while buffers still hold device allocations.
    #[snafu(display("{count} allocation(s) still resident on device {device_index}"))]
    BuffersStillResident { device_index: usize, count: usize },

    /// Shutdown attempted while other handles to a context are alive.
    #[snafu(display("context for device {device_index} has {handles} outstanding handle(s)"))]
    ContextInUse { device_index: usize, handles: usize },

    /// Buffer dimensions cannot be represented.
    #[snafu(display("invalid buffer extent: {source}"))]
    InvalidExtent { source: tessel_codegen::Error },

    /// Extent exceeds what a kernel launch can address.
    #[snafu(display("extent {extent} exceeds the launch limit of {limit} per dimension"))]
    ExtentTooLarge { extent: tessel_codegen::Extent, limit: usize },

    #[snafu(display("size mismatch: expected {expected}, got {actual}"))]
    SizeMismatch { expected: usize, actual: usize },

    /// Buffer has no device allocation.
    #[snafu(display("buffer not allocated on any device"))]
    NotAllocated,

    /// Device memory was handed to a context that does not own it.
    #[snafu(display("memory owned by context {owner} used on context {context}"))]
    ForeignMemory { owner: String, context: String },

    /// Device memory belongs to a different backend.
    #[snafu(display("memory of the {actual} backend passed to the {expected} backend"))]
    BackendMismatch { expected: &'static str, actual: &'static str },

    /// Host and device copies are both marked dirty.
    #[snafu(display("buffer is dirty on both host and device"))]
    DirtyConflict,

    /// The device copy is newer than the host copy and cannot be moved.
    #[snafu(display("device copy on device {device_index} is newer than the host copy"))]
    StaleHost { device_index: usize },

    /// Kernel source could not be compiled for the device.
    #[snafu(display("kernel compilation failed: {reason}"))]
    Compile { reason: String },

    /// Kernel has no GPU schedule but the backend needs one.
    #[snafu(display("kernel '{name}' has no GPU schedule"))]
    NotGpuScheduled { name: String },

    #[cfg(feature = "cuda")]
    /// CUDA-specific errors.
    #[snafu(display("CUDA error: {source}"))]
    Cuda { source: cudarc::driver::DriverError },
}

impl Error {
    /// Driver status code to report for this error.
    ///
    /// Errors that did not come from a driver call report `1`.
    pub fn driver_code(&self) -> i32 {
        match self {
            Error::NoRuntime { code, .. } | Error::DeviceContextCreationFailed { code, .. } => *code,
            Error::InsufficientDevices { .. } => CUDA_ERROR_NO_DEVICE,
            Error::BackendUnavailable { .. } => CUDA_ERROR_NOT_INITIALIZED,
            #[cfg(feature = "cuda")]
            Error::Cuda { source } => source.0 as i32,
            _ => 1,
        }
    }
}
