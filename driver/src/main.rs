//! `multi_gpu_support [iterations]`
//!
//! Runs the scale-and-offset kernel alternately on two devices and verifies
//! both outputs. Exits with 0 on success, the driver status code when device
//! setup fails, and -1 when an output is wrong.

use tessel_driver::DriverConfig;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    setup_logging();

    let config = DriverConfig::from_args_and_env(std::env::args().skip(1));
    if let Err(e) = tessel_driver::run(&config) {
        error!(error = %e, "multi_gpu_support failed");
        std::process::exit(e.exit_code());
    }
}
