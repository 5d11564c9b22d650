use std::sync::Arc;

use test_case::test_case;

use crate::test::pool;
use crate::{ContextHook, ContextRouter, Error, Selector};

#[test_case(1, 0; "first")]
#[test_case(2, 1; "second")]
fn test_selector_routes_to_device(tag: u32, device_index: usize) {
    let pool = pool();
    let router = ContextRouter::new(&pool);

    let context = router.acquire(Some(Selector::new(tag))).unwrap();
    assert_eq!(context.device_index(), device_index);
    assert!(Arc::ptr_eq(&context, pool.get(device_index).unwrap()));
}

#[test_case(0; "zero")]
#[test_case(3; "past_end")]
#[test_case(u32::MAX; "max")]
fn test_unknown_selector(tag: u32) {
    let pool = pool();
    let router = ContextRouter::new(&pool);

    let err = router.acquire(Some(Selector::new(tag))).unwrap_err();
    assert!(matches!(err, Error::UnknownSelector { selector } if selector.tag() == tag));
}

#[test]
fn test_acquire_is_idempotent() {
    let pool = pool();
    let router = ContextRouter::new(&pool);

    for tag in [1, 2] {
        let a = router.acquire(Some(Selector::new(tag))).unwrap();
        let b = router.acquire(Some(Selector::new(tag))).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}

#[test]
fn test_missing_selector_defaults_to_first_device() {
    let pool = pool();
    let router = ContextRouter::new(&pool);

    let context = router.acquire(None).unwrap();
    assert!(Arc::ptr_eq(&context, pool.get(0).unwrap()));
}

#[test]
fn test_release_is_noop() {
    let pool = pool();
    let router = ContextRouter::new(&pool);

    let context = router.acquire(Some(Selector::new(2))).unwrap();
    router.release(Some(Selector::new(2))).unwrap();
    router.release(None).unwrap();
    assert_eq!(Arc::strong_count(&context), 2);
}

#[test_case(0, Some(1); "first")]
#[test_case(1, Some(2); "second")]
#[test_case(u32::MAX as usize, None; "overflow")]
fn test_selector_for_device(device_index: usize, tag: Option<u32>) {
    let selector = Selector::for_device(device_index);
    assert_eq!(selector.map(Selector::tag), tag);
    if let Some(selector) = selector {
        assert_eq!(selector.device_index(), Some(device_index));
    }
}

#[test]
fn test_selector_zero_has_no_device() {
    assert_eq!(Selector::new(0).device_index(), None);
    assert_eq!(Selector::new(7).to_string(), "7");
}

#[test]
#[tracing_test::traced_test]
fn test_acquire_reports_selected_device() {
    let pool = pool();
    let router = ContextRouter::new(&pool);

    router.acquire(Some(Selector::new(2))).unwrap();
    router.acquire(None).unwrap();

    assert!(logs_contain("context acquired"));
    assert!(logs_contain("device.index=1"));
    assert!(logs_contain("no selector supplied, defaulting to device 0"));
}
