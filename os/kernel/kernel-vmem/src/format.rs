//! # Page-Table Formats
//!
//! A [`PageTableFormat`] describes one hardware radix-tree geometry: how many
//! levels it has, which virtual-address bits index each level, and how an
//! entry is encoded. The walker and the lifecycle code are generic over it.
//!
//! Levels are numbered from the root: level `0` is the root table and level
//! `LEVELS - 1` holds the last-level (4 KiB) leaf entries. An entry *at* level
//! `l` lives in a table of level `l` and, if it is a table entry, points at a
//! table of level `l + 1`.
//!
//! | Format | Entry | Levels | Index bits | Interior leaves | Tables per frame |
//! |--------|-------|--------|------------|-----------------|------------------|
//! | [`X86TwoLevel`]  | 32 bit | 2 | 10/10     | 4 MiB (PS)            | 1 |
//! | [`X86FourLevel`] | 64 bit | 4 | 9/9/9/9   | 1 GiB, 2 MiB (PS)     | 1 |
//! | [`SparcSrmmu`]   | 32 bit | 3 | 8/6/6     | 16 MiB, 256 KiB       | 16 at levels 1 and 2 |
//! | [`RiscvSv39`]    | 64 bit | 3 | 9/9/9     | 1 GiB, 2 MiB          | 1 |

use crate::PagePermissions;
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, VirtualAddress};

mod srmmu;
mod sv39;
mod x86_32;
mod x86_64;

pub use srmmu::SparcSrmmu;
pub use sv39::{RiscvSv39, Sv39Entry};
pub use x86_32::{X86Entry32, X86TwoLevel};
pub use x86_64::{X86Entry64, X86FourLevel};

/// Decoded meaning of a single page-table entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Not present.
    Absent,
    /// Points at the next-level table located at the given physical address.
    ///
    /// The address carries a page offset for formats that pack several
    /// tables into one frame.
    Table(PhysicalAddress),
    /// Terminates translation.
    Leaf {
        /// Base of the mapped region (aligned to the level's span).
        frame: PhysicalAddress,
        permissions: PagePermissions,
    },
}

impl EntryKind {
    #[inline]
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[inline]
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// A hardware page-table geometry.
pub trait PageTableFormat {
    /// In-memory representation of one entry.
    type Raw: Copy + Eq + core::fmt::Debug;

    /// Human readable name, used in log output.
    const NAME: &'static str;

    /// Number of table levels (root included).
    const LEVELS: usize;

    /// Encoding of a not-present entry. Freshly zeroed tables consist of it.
    const ABSENT: Self::Raw;

    /// Number of virtual-address bits consumed by `level`.
    fn index_bits(level: usize) -> u32;

    /// Position of the lowest index bit of `level`.
    fn index_shift(level: usize) -> u32;

    /// Decode an entry found at `level`.
    fn decode(level: usize, raw: Self::Raw) -> EntryKind;

    /// Encode an entry at `level` pointing to the child table at `table`.
    fn encode_table(level: usize, table: PhysicalAddress) -> Self::Raw;

    /// Encode a leaf entry at `level` mapping `frame`.
    ///
    /// `frame` must be aligned to [`leaf_span(level)`](Self::leaf_span) and
    /// [`leaf_allowed(level)`](Self::leaf_allowed) must hold.
    fn encode_leaf(level: usize, frame: PhysicalAddress, permissions: PagePermissions) -> Self::Raw;

    /// Whether a leaf mapping may be installed at `level`.
    fn leaf_allowed(level: usize) -> bool;

    /// Number of entries in a table of `level`.
    #[inline]
    #[must_use]
    fn entries(level: usize) -> usize {
        1usize << Self::index_bits(level)
    }

    /// Index into the table of `level` selected by `va`.
    #[inline]
    #[must_use]
    fn index(level: usize, va: VirtualAddress) -> usize {
        va.bits(Self::index_shift(level), Self::index_bits(level))
    }

    /// Size in bytes of one table of `level`.
    #[inline]
    #[must_use]
    fn table_bytes(level: usize) -> usize {
        Self::entries(level) * size_of::<Self::Raw>()
    }

    /// How many sibling tables of `level` share one physical frame.
    ///
    /// The root always occupies a frame of its own.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    fn tables_per_frame(level: usize) -> usize {
        if level == 0 {
            1
        } else {
            (PAGE_SIZE as usize / Self::table_bytes(level)).max(1)
        }
    }

    /// Whether any level packs several tables into one frame.
    #[inline]
    #[must_use]
    fn supports_packed_siblings() -> bool {
        (1..Self::LEVELS).any(|level| Self::tables_per_frame(level) > 1)
    }

    /// Bytes of address space mapped by one entry of `level`.
    #[inline]
    #[must_use]
    fn leaf_span(level: usize) -> u64 {
        1u64 << Self::index_shift(level)
    }

    /// Level holding the base-page leaf entries.
    #[inline]
    #[must_use]
    fn last_level() -> usize {
        Self::LEVELS - 1
    }
}
