use crate::{PAGE_SIZE, Pfn, PhysicalAddress, align_down, align_up};
use core::fmt;

/// Half-open range of physical frames `[start, end)`.
///
/// An empty range has `start >= end`; all operations treat it as containing
/// nothing.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PfnRange {
    start: Pfn,
    end: Pfn,
}

impl PfnRange {
    #[inline]
    #[must_use]
    pub const fn new(start: Pfn, end: Pfn) -> Self {
        Self { start, end }
    }

    /// Frames fully contained in the physical byte range `[start, end)`.
    ///
    /// The start is rounded up and the end rounded down: a frame only partly
    /// covered by the range is not part of it.
    #[inline]
    #[must_use]
    pub const fn from_phys(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        let s = align_up(start.as_u64(), PAGE_SIZE);
        let e = align_down(end.as_u64(), PAGE_SIZE);
        Self::new(
            PhysicalAddress::new(s).pfn(),
            PhysicalAddress::new(e).pfn(),
        )
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> Pfn {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> Pfn {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start.as_usize() >= self.end.as_usize()
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.as_usize().saturating_sub(self.start.as_usize())
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, pfn: Pfn) -> bool {
        self.start.as_usize() <= pfn.as_usize() && pfn.as_usize() < self.end.as_usize()
    }

    /// Overlap of two ranges (possibly empty).
    #[inline]
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// The parts of `self` below and above `hole`.
    #[inline]
    #[must_use]
    pub fn split_around(&self, hole: &Self) -> (Self, Self) {
        let below = Self::new(self.start, self.end.min(hole.start));
        let above = Self::new(self.start.max(hole.end), self.end);
        (below, above)
    }

    /// Iterate the frames of the range in ascending order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Pfn> + use<> {
        (self.start.as_usize()..self.end.as_usize().max(self.start.as_usize())).map(Pfn::new)
    }
}

impl fmt::Debug for PfnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PfnRange[{}..{})", self.start, self.end)
    }
}
