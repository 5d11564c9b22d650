use std::cell::Cell;
use std::sync::Arc;

use tessel_device::{Buffer, Context};

use crate::test::{kernel, pool};
use crate::{ContextHook, ContextRouter, Error, KernelRuntime, Result, Selector};

/// Router that counts hook calls.
#[derive(Debug)]
struct CountingHook<'pool> {
    inner: ContextRouter<'pool>,
    acquired: Cell<usize>,
    released: Cell<usize>,
}

impl<'pool> CountingHook<'pool> {
    fn new(inner: ContextRouter<'pool>) -> Self {
        Self { inner, acquired: Cell::new(0), released: Cell::new(0) }
    }
}

impl ContextHook for CountingHook<'_> {
    fn acquire(&self, selector: Option<Selector>) -> Result<Arc<dyn Context>> {
        self.acquired.set(self.acquired.get() + 1);
        self.inner.acquire(selector)
    }

    fn release(&self, selector: Option<Selector>) -> Result<()> {
        self.released.set(self.released.get() + 1);
        self.inner.release(selector)
    }
}

#[test]
fn test_two_device_scenario() {
    let mut pool = pool();
    let mut input = Buffer::from_fn(4, 3, |x, y| (x * y) as f32).unwrap();
    let mut outputs = [Buffer::new(4, 3).unwrap(), Buffer::new(4, 3).unwrap()];

    {
        let mut runtime = KernelRuntime::new(ContextRouter::new(&pool), kernel());
        for (device_index, output) in outputs.iter_mut().enumerate() {
            input.set_host_dirty();
            runtime.launch(Selector::for_device(device_index), &mut input, output).unwrap();
            assert_eq!(output.device_index(), Some(device_index));
            output.copy_to_host().unwrap();
        }
    }

    for output in &outputs {
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(output[(x, y)], (x * y) as f32 * 2.0 + 1.0);
            }
        }
        assert_eq!(output[(3, 2)], 13.0);
    }

    input.device_free().unwrap();
    for output in &mut outputs {
        output.device_free().unwrap();
    }
    pool.shutdown().unwrap();
}

#[test]
fn test_launch_without_selector_uses_first_device() {
    let pool = pool();
    let mut runtime = KernelRuntime::new(ContextRouter::new(&pool), kernel());
    let mut input = Buffer::from_fn(2, 2, |x, _| x as f32).unwrap();
    let mut output = Buffer::new(2, 2).unwrap();

    runtime.launch(None, &mut input, &mut output).unwrap();

    assert_eq!(output.device_index(), Some(0));
    assert!(output.device_dirty());
}

#[test]
fn test_release_follows_failed_launch() {
    let pool = pool();
    let mut runtime = KernelRuntime::new(CountingHook::new(ContextRouter::new(&pool)), kernel());
    let mut input = Buffer::new(2, 2).unwrap();
    let mut output = Buffer::new(2, 2).unwrap();

    runtime.launch(Some(Selector::new(1)), &mut input, &mut output).unwrap();

    // A stale device copy on device 0 cannot be moved to device 1.
    let err = runtime.launch(Some(Selector::new(2)), &mut input, &mut output).unwrap_err();
    assert!(matches!(err, Error::Device { source: tessel_device::Error::StaleHost { device_index: 0 } }));

    let hook = runtime.hook();
    assert_eq!(hook.acquired.get(), 2);
    assert_eq!(hook.released.get(), 2);
}

#[test]
fn test_unknown_selector_fails_launch() {
    let pool = pool();
    let mut runtime = KernelRuntime::new(CountingHook::new(ContextRouter::new(&pool)), kernel());
    let mut input = Buffer::new(2, 2).unwrap();
    let mut output = Buffer::new(2, 2).unwrap();

    let err = runtime.launch(Some(Selector::new(3)), &mut input, &mut output).unwrap_err();

    assert!(matches!(err, Error::UnknownSelector { .. }));
    assert!(!output.is_device_resident());
    assert_eq!(runtime.hook().released.get(), 0);
}

#[test]
fn test_extent_mismatch() {
    let pool = pool();
    let mut runtime = KernelRuntime::new(CountingHook::new(ContextRouter::new(&pool)), kernel());
    let mut input = Buffer::new(2, 2).unwrap();
    let mut output = Buffer::new(3, 2).unwrap();

    let err = runtime.launch(Some(Selector::new(1)), &mut input, &mut output).unwrap_err();

    assert!(matches!(err, Error::ExtentMismatch { .. }));
    assert_eq!(runtime.hook().acquired.get(), 0);
}

#[test]
fn test_program_loaded_once_per_context() {
    let pool = pool();
    let mut runtime = KernelRuntime::new(ContextRouter::new(&pool), kernel());
    let mut input = Buffer::new(4, 4).unwrap();
    let mut outputs = [Buffer::new(4, 4).unwrap(), Buffer::new(4, 4).unwrap()];

    for _ in 0..3 {
        for (device_index, output) in outputs.iter_mut().enumerate() {
            input.set_host_dirty();
            runtime.launch(Selector::for_device(device_index), &mut input, output).unwrap();
            output.copy_to_host().unwrap();
        }
    }
    assert_eq!(runtime.cached_programs(), 2);

    // Cached programs hold their contexts.
    assert_eq!(Arc::strong_count(pool.get(0).unwrap()), 3);
    runtime.clear_cache();
    assert_eq!(runtime.cached_programs(), 0);
}
