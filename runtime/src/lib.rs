//! Kernel runtime for tessel.
//!
//! Every launch asks a [`ContextHook`] which device context to run on. The
//! default hook, [`ContextRouter`], maps a per-call [`Selector`] onto the
//! contexts held by a [`tessel_device::ContextPool`].
//!
//! - [`selector`]: the routing tag passed with each launch
//! - [`router`]: the acquire/release hook contract and the pool-backed router
//! - [`executor`]: [`KernelRuntime`], which uploads, executes and marks results
//! - [`kernel_cache`]: loaded programs, one per (context, kernel)

pub mod error;
pub mod executor;
pub mod kernel_cache;
pub mod router;
pub mod selector;


pub use error::*;
pub use executor::KernelRuntime;
pub use kernel_cache::KernelCache;
pub use router::{ContextHook, ContextRouter};
pub use selector::Selector;
