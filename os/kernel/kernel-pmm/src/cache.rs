//! # Cache Topology
//!
//! Geometry of the CPU caches and the page colors derived from it.
//!
//! A physically indexed cache maps an address to a set using the bits right
//! above the line offset. When `bytes_per_way` exceeds the page size, some of
//! those index bits lie above the page offset: they are part of the frame
//! number. Frames that agree in these bits compete for the same sets and share
//! a **color**.
//!
//! ```text
//!  physical address
//! ┌────────────────────────────┬─────────────┬───────────────┐
//! │            tag             │    index    │  line offset  │
//! └────────────────────────────┴──────┬──────┴───────────────┘
//!                              ◄─────►│
//!                           color bits│◄──── page offset ────►
//! ```
//!
//! `num_colors = bytes_per_way / PAGE_SIZE`, and `color_of(pfn)` is simply
//! `pfn mod num_colors`.

use core::fmt;
use core::ops::Range;
use kernel_memory_addresses::{PAGE_SHIFT, PAGE_SIZE, Pfn};
use log::{debug, warn};

/// Upper bound on the number of colors tracked by the allocator.
pub const MAX_COLORS: usize = 1024;

/// A cache level that can be described in a [`CacheTopology`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheLevel {
    L1,
    L2,
    L3,
}

impl CacheLevel {
    pub const ALL: [Self; 3] = [Self::L1, Self::L2, Self::L3];

    #[inline]
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::L1 => 0,
            Self::L2 => 1,
            Self::L3 => 2,
        }
    }
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L1 => f.write_str("L1"),
            Self::L2 => f.write_str("L2"),
            Self::L3 => f.write_str("L3"),
        }
    }
}

/// Geometry of one cache level.
///
/// The color count is derived once at construction. Geometries that do not
/// yield a power of two (or yield zero) disable coloring for this cache: it
/// then reports a single color.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CacheDescriptor {
    size_bytes: usize,
    ways: usize,
    line_size: usize,
    num_colors: usize,
}

#[inline]
const fn log2_up(x: usize) -> u32 {
    if x <= 1 { 0 } else { usize::BITS - (x - 1).leading_zeros() }
}

impl CacheDescriptor {
    /// Describe a cache of `size_bytes` with `ways`-way associativity and
    /// `line_size`-byte lines.
    #[must_use]
    pub fn new(size_bytes: usize, ways: usize, line_size: usize) -> Self {
        let mut c = Self {
            size_bytes,
            ways,
            line_size,
            num_colors: 1,
        };
        c.num_colors = c.derive_num_colors();
        c
    }

    fn derive_num_colors(&self) -> usize {
        if !cfg!(feature = "page-coloring") {
            return 1;
        }

        let colors = self.pages_per_way();
        if colors == 0 || !colors.is_power_of_two() {
            warn!(
                "cache {}K/{}-way/{}B yields {colors} page colors; coloring disabled",
                self.size_kilobytes(),
                self.ways,
                self.line_size
            );
            return 1;
        }
        if colors > MAX_COLORS {
            warn!("cache yields {colors} page colors; clamped to {MAX_COLORS}");
            return MAX_COLORS;
        }
        colors
    }

    #[inline]
    #[must_use]
    pub const fn ways_associative(&self) -> usize {
        self.ways
    }

    #[inline]
    #[must_use]
    pub const fn line_size_bytes(&self) -> usize {
        self.line_size
    }

    #[inline]
    #[must_use]
    pub const fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    #[inline]
    #[must_use]
    pub const fn size_kilobytes(&self) -> usize {
        self.size_bytes / 1024
    }

    #[inline]
    #[must_use]
    pub const fn size_megabytes(&self) -> usize {
        self.size_bytes / (1024 * 1024)
    }

    /// Bits selecting a byte within a line.
    #[inline]
    #[must_use]
    pub const fn offset_bits(&self) -> u32 {
        log2_up(self.line_size)
    }

    /// Bits selecting a set.
    #[inline]
    #[must_use]
    pub const fn index_bits(&self) -> u32 {
        log2_up(self.bytes_per_way() / max1(self.line_size))
    }

    /// Remaining address bits for an `address_bits`-wide physical address.
    #[inline]
    #[must_use]
    pub const fn tag_bits(&self, address_bits: u32) -> u32 {
        address_bits.saturating_sub(self.offset_bits() + self.index_bits())
    }

    /// Index bits that lie above the page offset.
    #[inline]
    #[must_use]
    pub const fn page_color_bits(&self) -> u32 {
        (self.offset_bits() + self.index_bits()).saturating_sub(PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn bytes_per_line(&self) -> usize {
        1 << self.offset_bits()
    }

    #[inline]
    #[must_use]
    pub const fn num_lines(&self) -> usize {
        self.size_bytes / self.bytes_per_line()
    }

    #[inline]
    #[must_use]
    pub const fn num_sets(&self) -> usize {
        self.num_lines() / max1(self.ways)
    }

    #[inline]
    #[must_use]
    pub const fn lines_per_set(&self) -> usize {
        self.ways
    }

    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn lines_per_page(&self) -> usize {
        PAGE_SIZE as usize / self.bytes_per_line()
    }

    #[inline]
    #[must_use]
    pub const fn bytes_per_way(&self) -> usize {
        self.size_bytes / max1(self.ways)
    }

    #[inline]
    #[must_use]
    pub const fn lines_per_way(&self) -> usize {
        self.num_lines() / max1(self.ways)
    }

    /// Raw page count of one way. Equals the color count for valid geometries.
    #[inline]
    #[must_use]
    pub const fn pages_per_way(&self) -> usize {
        self.lines_per_way() / max1(self.lines_per_page())
    }

    /// Number of distinguishable page colors (always a power of two).
    #[inline]
    #[must_use]
    pub const fn num_colors(&self) -> usize {
        self.num_colors
    }

    /// Color of `pfn` in this cache.
    #[inline]
    #[must_use]
    pub const fn color_of(&self, pfn: Pfn) -> usize {
        pfn.as_usize() & (self.num_colors - 1)
    }

    /// Emit the derived geometry at `debug` level.
    pub fn log_properties(&self, name: &str) {
        debug!("{name}_WAYS_ASSOCIATIVE: {}", self.ways_associative());
        debug!("{name}_LINE_SIZE_BYTES: {}", self.line_size_bytes());
        debug!("{name}_SIZE_BYTES: {}", self.size_bytes());
        debug!("{name}_SIZE_KILOBYTES: {}", self.size_kilobytes());
        debug!("{name}_SIZE_MEGABYTES: {}", self.size_megabytes());
        debug!("{name}_OFFSET_BITS: {}", self.offset_bits());
        debug!("{name}_INDEX_BITS: {}", self.index_bits());
        debug!("{name}_TAG_BITS: {}", self.tag_bits(u64::BITS));
        debug!("{name}_PAGE_COLOR_BITS: {}", self.page_color_bits());
        debug!("{name}_BYTES_PER_LINE: {}", self.bytes_per_line());
        debug!("{name}_NUM_LINES: {}", self.num_lines());
        debug!("{name}_NUM_SETS: {}", self.num_sets());
        debug!("{name}_LINES_PER_SET: {}", self.lines_per_set());
        debug!("{name}_LINES_PER_PAGE: {}", self.lines_per_page());
        debug!("{name}_BYTES_PER_WAY: {}", self.bytes_per_way());
        debug!("{name}_LINES_PER_WAY: {}", self.lines_per_way());
        debug!("{name}_PAGES_PER_WAY: {}", self.pages_per_way());
        debug!("{name}_NUM_PAGE_COLORS: {}", self.num_colors());
    }
}

#[inline]
const fn max1(x: usize) -> usize {
    if x == 0 { 1 } else { x }
}

/// The colors of a cache with `to` colors that overlap `color` of a cache
/// with `from` colors.
///
/// Both counts are powers of two. Going to a finer cache yields the
/// `to / from` sub-colors of `color`; going to a coarser one yields the single
/// color containing it.
///
/// ```
/// # use kernel_pmm::overlapping_colors;
/// assert_eq!(overlapping_colors(4, 16, 1), 4..8);
/// assert_eq!(overlapping_colors(16, 4, 9), 2..3);
/// assert_eq!(overlapping_colors(8, 8, 5), 5..6);
/// ```
#[inline]
#[must_use]
pub const fn overlapping_colors(from: usize, to: usize, color: usize) -> Range<usize> {
    if from <= to {
        let r = to / from;
        color * r..color * r + r
    } else {
        let base = color / (from / to);
        base..base + 1
    }
}

/// The described cache levels of the machine.
///
/// The last-level cache (LLC), the largest level present, decides page colors
/// for the allocator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheTopology {
    levels: [Option<CacheDescriptor>; 3],
}

impl CacheTopology {
    /// A topology with no described caches (one color).
    #[must_use]
    pub const fn none() -> Self {
        Self { levels: [None; 3] }
    }

    #[must_use]
    pub const fn with(mut self, level: CacheLevel, cache: CacheDescriptor) -> Self {
        self.levels[level.index()] = Some(cache);
        self
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, level: CacheLevel) -> Option<&CacheDescriptor> {
        self.levels[level.index()].as_ref()
    }

    /// The last-level cache: L3 if present, else L2, else L1.
    #[must_use]
    pub fn llc(&self) -> Option<(CacheLevel, &CacheDescriptor)> {
        CacheLevel::ALL
            .iter()
            .rev()
            .find_map(|&level| self.get(level).map(|c| (level, c)))
    }

    /// Color count of the LLC, or 1 without one.
    #[must_use]
    pub fn llc_colors(&self) -> usize {
        self.llc().map_or(1, |(_, c)| c.num_colors())
    }

    /// Present levels, L1 first.
    pub fn levels(&self) -> impl Iterator<Item = (CacheLevel, &CacheDescriptor)> {
        CacheLevel::ALL
            .into_iter()
            .filter_map(|level| self.get(level).map(|c| (level, c)))
    }

    pub fn log_properties(&self) {
        for (level, cache) in self.levels() {
            match level {
                CacheLevel::L1 => cache.log_properties("L1"),
                CacheLevel::L2 => cache.log_properties("L2"),
                CacheLevel::L3 => cache.log_properties("L3"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_cache_has_four_colors() {
        // 64 KiB, 4-way, 64 B lines: 16 KiB per way, four pages.
        let c = CacheDescriptor::new(64 * 1024, 4, 64);
        assert_eq!(c.bytes_per_way(), 16 * 1024);
        assert_eq!(c.pages_per_way(), 4);
        assert_eq!(c.num_colors(), 4);
        assert_eq!(c.color_of(Pfn::new(6)), 2);
    }

    #[test]
    fn derived_geometry() {
        // 8 MiB, 16-way, 64 B lines.
        let c = CacheDescriptor::new(8 << 20, 16, 64);
        assert_eq!(c.offset_bits(), 6);
        assert_eq!(c.index_bits(), 13);
        assert_eq!(c.tag_bits(64), 45);
        assert_eq!(c.page_color_bits(), 7);
        assert_eq!(c.num_lines(), 131_072);
        assert_eq!(c.num_sets(), 8192);
        assert_eq!(c.lines_per_page(), 64);
        assert_eq!(c.num_colors(), 1 << c.page_color_bits());
        assert_eq!(c.size_megabytes(), 8);
    }

    #[test]
    fn unsupported_geometry_degrades_to_one_color() {
        // 48 KiB per way: twelve pages.
        let c = CacheDescriptor::new(576 * 1024, 12, 64);
        assert_eq!(c.pages_per_way(), 12);
        assert_eq!(c.num_colors(), 1);

        // Smaller than a page per way.
        let c = CacheDescriptor::new(16 * 1024, 8, 64);
        assert_eq!(c.pages_per_way(), 0);
        assert_eq!(c.num_colors(), 1);
        assert_eq!(c.color_of(Pfn::new(12345)), 0);

        // Nonsense geometry does not divide by zero.
        let c = CacheDescriptor::new(0, 0, 0);
        assert_eq!(c.num_colors(), 1);
    }

    #[test]
    fn huge_color_counts_are_clamped() {
        // 64 MiB direct-mapped: 16384 pages per way.
        let c = CacheDescriptor::new(64 << 20, 1, 64);
        assert_eq!(c.pages_per_way(), 16384);
        assert_eq!(c.num_colors(), MAX_COLORS);
    }

    #[test]
    fn llc_is_largest_present_level() {
        let l1 = CacheDescriptor::new(32 * 1024, 8, 64);
        let l2 = CacheDescriptor::new(256 * 1024, 8, 64);
        let t = CacheTopology::none().with(CacheLevel::L1, l1).with(CacheLevel::L2, l2);
        assert_eq!(t.llc(), Some((CacheLevel::L2, &l2)));
        assert_eq!(t.llc_colors(), 8);
        assert_eq!(t.levels().count(), 2);
        assert_eq!(CacheTopology::none().llc_colors(), 1);
    }

    #[test]
    fn overlapping_colors_both_directions() {
        assert_eq!(overlapping_colors(1, 8, 0), 0..8);
        assert_eq!(overlapping_colors(8, 1, 7), 0..1);
        assert_eq!(overlapping_colors(2, 8, 1), 4..8);
    }
}
