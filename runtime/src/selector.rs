use std::fmt;

/// Per-launch routing tag.
///
/// Tags are 1-based: tag `n` names device `n - 1`. The runtime never looks
/// inside a selector; only a [`ContextHook`](crate::ContextHook) interprets it.
/// Tag 0 is representable but names no device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector(u32);

impl Selector {
    pub const fn new(tag: u32) -> Self {
        Self(tag)
    }

    /// Selector naming `device_index`, if the index fits the tag range.
    pub fn for_device(device_index: usize) -> Option<Self> {
        u32::try_from(device_index).ok()?.checked_add(1).map(Self)
    }

    pub const fn tag(self) -> u32 {
        self.0
    }

    /// Device index this selector names, or `None` for tag 0.
    pub fn device_index(self) -> Option<usize> {
        self.0.checked_sub(1).map(|index| index as usize)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
