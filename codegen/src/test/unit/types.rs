use test_case::test_case;

use crate::{Error, Extent};

#[test_case(1920, 1080; "full_hd")]
#[test_case(4, 3; "small")]
#[test_case(0, 7; "empty")]
fn test_extent_try_new(width: usize, height: usize) {
    let extent = Extent::try_new(width, height).unwrap();
    assert_eq!(extent.len(), width * height);
    assert_eq!(extent.checked_len(), Some(width * height));
}

#[test_case(usize::MAX / 2, 3; "element_overflow")]
#[test_case(usize::MAX, usize::MAX; "both_max")]
#[test_case(1 << 31, 1 << 31; "byte_overflow")]
fn test_extent_try_new_rejects_overflow(width: usize, height: usize) {
    let err = Extent::try_new(width, height).unwrap_err();
    assert!(matches!(err, Error::InvalidExtent { width: w, height: h } if w == width && h == height));
}

#[test]
fn test_extent_display_and_index() {
    let extent = Extent::new(4, 3);
    assert_eq!(extent.to_string(), "4x3");
    assert_eq!(extent.index(3, 2), 11);
}
