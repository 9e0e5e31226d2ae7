//! Per-frame descriptors.

use bitflags::bitflags;
use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

bitflags! {
    /// State bits of a [`PageFrame`].
    ///
    /// `FREE` is owned by the allocator and tracks free-list membership.
    /// The remaining bits are for the frame's user.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PageFlags: u32 {
        const LOCKED = 1 << 0;
        const DIRTY = 1 << 1;
        /// Frame backs a block-cache buffer.
        const BUFFER = 1 << 2;
        const FREE = 1 << 31;
    }
}

impl PageFlags {
    /// Bits callers may set and clear.
    pub const USER: Self = Self::LOCKED.union(Self::DIRTY).union(Self::BUFFER);
}

/// Descriptor of one physical frame.
///
/// One descriptor exists per frame below the configured maximum. A frame is
/// on exactly one free list iff its reference count is zero. The list links
/// are only read or written with the free-list lock held.
///
/// Frames start out *busy* with one reference, so memory the boot code never
/// hands over stays reserved.
pub struct PageFrame {
    ref_count: AtomicU32,
    flags: AtomicU32,
    pub(crate) next: AtomicU32,
    pub(crate) prev: AtomicU32,
    owner: AtomicUsize,
}

impl PageFrame {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ref_count: AtomicU32::new(1),
            flags: AtomicU32::new(0),
            next: AtomicU32::new(u32::MAX),
            prev: AtomicU32::new(u32::MAX),
            owner: AtomicUsize::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Acquire)
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> PageFlags {
        PageFlags::from_bits_retain(self.flags.load(Ordering::Acquire))
    }

    #[inline]
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.flags().contains(PageFlags::FREE)
    }

    /// Opaque tag of the frame's current user (0 if none).
    #[inline]
    #[must_use]
    pub fn owner(&self) -> usize {
        self.owner.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn ref_count_atomic(&self) -> &AtomicU32 {
        &self.ref_count
    }

    #[inline]
    pub(crate) fn insert_flags(&self, flags: PageFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn remove_flags(&self, flags: PageFlags) {
        self.flags.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn set_owner(&self, owner: usize) {
        self.owner.store(owner, Ordering::Relaxed);
    }

    /// Move to the free state. Free-list lock held.
    pub(crate) fn mark_free(&self) {
        self.ref_count.store(0, Ordering::Release);
        self.flags.store(PageFlags::FREE.bits(), Ordering::Release);
        self.owner.store(0, Ordering::Relaxed);
    }

    /// Hand out with `refs` references and no flags. Free-list lock held.
    pub(crate) fn mark_allocated(&self, refs: u32) {
        self.flags.store(0, Ordering::Release);
        self.owner.store(0, Ordering::Relaxed);
        self.ref_count.store(refs, Ordering::Release);
    }
}

impl Default for PageFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrame")
            .field("ref_count", &self.ref_count())
            .field("flags", &self.flags())
            .field("owner", &self.owner())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_start_busy() {
        let f = PageFrame::new();
        assert_eq!(f.ref_count(), 1);
        assert!(!f.is_free());
        assert_eq!(f.owner(), 0);
    }

    #[test]
    fn state_transitions() {
        let f = PageFrame::new();
        f.set_owner(7);
        f.insert_flags(PageFlags::DIRTY);
        f.mark_free();
        assert_eq!(f.ref_count(), 0);
        assert_eq!(f.flags(), PageFlags::FREE);
        assert_eq!(f.owner(), 0);

        f.mark_allocated(1);
        assert_eq!(f.ref_count(), 1);
        assert!(f.flags().is_empty());
    }

    #[test]
    fn user_flags_exclude_free() {
        assert!(!PageFlags::USER.contains(PageFlags::FREE));
        assert!(PageFlags::USER.contains(PageFlags::BUFFER));
    }
}
