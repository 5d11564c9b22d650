//! Driver configuration.

use std::str::FromStr;

use bon::bon;
use tessel_codegen::{Arch, Feature, Target};
use tessel_device::BackendKind;
use tracing::warn;

pub const DEFAULT_ITERATIONS: usize = 1000;
pub const DEFAULT_WIDTH: usize = 1920;
pub const DEFAULT_HEIGHT: usize = 1080;
/// Virtual devices exposed when the virtual backend is selected.
pub const DEFAULT_DEVICES: usize = 2;

/// Everything the driver needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Launch rounds; each round launches once per device.
    pub iterations: usize,
    pub width: usize,
    pub height: usize,
    pub backend: BackendKind,
    /// Device count of the virtual backend. Ignored by real backends.
    pub devices: usize,
    /// Target the kernel is generated for.
    pub target: Target,
}

fn default_target() -> Target {
    Target::new(Arch::Host).with_feature(Feature::Cuda)
}

#[bon]
impl DriverConfig {
    /// Create a config with builder pattern.
    #[builder(finish_fn = build)]
    pub fn builder(
        #[builder(default = DEFAULT_ITERATIONS)] iterations: usize,
        #[builder(default = DEFAULT_WIDTH)] width: usize,
        #[builder(default = DEFAULT_HEIGHT)] height: usize,
        #[builder(default)] backend: BackendKind,
        #[builder(default = DEFAULT_DEVICES)] devices: usize,
        #[builder(default = default_target())] target: Target,
    ) -> Self {
        Self { iterations, width, height, backend, devices, target }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DriverConfig {
    /// Load config from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TESSEL_BACKEND` - `virtual` or `cuda` (default: `cuda` when compiled in)
    /// * `TESSEL_DEVICES` - Virtual device count (default: 2)
    /// * `TESSEL_WIDTH` / `TESSEL_HEIGHT` - Image extent (default: 1920x1080)
    /// * `TESSEL_TARGET` - Kernel target string (default: `host-cuda`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) with the iteration count taken from the
    /// first positional argument.
    pub fn from_args_and_env(args: impl IntoIterator<Item = String>) -> Self {
        let iterations = parse_iterations(args.into_iter().next().as_deref());
        Self { iterations, ..Self::from_env() }
    }

    /// Load config through `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str, default: usize| match lookup(key) {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                warn!(key, value = %value, default, "setting is not a count, using default");
                default
            }),
            None => default,
        };

        let backend = BackendKind::from_setting(lookup("TESSEL_BACKEND").as_deref());
        let target = match lookup("TESSEL_TARGET") {
            Some(value) => Target::from_str(value.trim()).unwrap_or_else(|e| {
                warn!(value = %value, error = %e, "invalid TESSEL_TARGET, using default");
                default_target()
            }),
            None => default_target(),
        };

        Self::builder()
            .width(parsed("TESSEL_WIDTH", DEFAULT_WIDTH))
            .height(parsed("TESSEL_HEIGHT", DEFAULT_HEIGHT))
            .devices(parsed("TESSEL_DEVICES", DEFAULT_DEVICES))
            .backend(backend)
            .target(target)
            .build()
    }
}

/// Iteration count from a command-line argument.
///
/// A missing or non-numeric argument selects [`DEFAULT_ITERATIONS`].
pub fn parse_iterations(arg: Option<&str>) -> usize {
    match arg {
        None => DEFAULT_ITERATIONS,
        Some(s) => s.trim().parse().unwrap_or_else(|_| {
            warn!(arg = s, default = DEFAULT_ITERATIONS, "iteration count is not a number, using default");
            DEFAULT_ITERATIONS
        }),
    }
}
