//! RISC-V Sv39: three levels of 512 eight-byte entries.
//!
//! An entry is a leaf as soon as any of `R`, `W` or `X` is set, at any level
//! (1 GiB gigapages at the root, 2 MiB megapages at level 1). A valid entry
//! with `R = W = X = 0` points at the next table.

use super::{EntryKind, PageTableFormat};
use crate::PagePermissions;
use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// A single Sv39 page table entry.
///
/// | Bits  | Name  | Meaning |
/// |-------|-------|---------|
/// | 0     | `V`   | Valid |
/// | 1     | `R`   | Readable |
/// | 2     | `W`   | Writable |
/// | 3     | `X`   | Executable |
/// | 4     | `U`   | User accessible |
/// | 5     | `G`   | Global |
/// | 6     | `A`   | Accessed |
/// | 7     | `D`   | Dirty |
/// | 8–9   | `RSW` | Reserved for software |
/// | 10–53 | `PPN` | Physical page number |
/// | 54–63 |       | Reserved, must be zero |
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Sv39Entry {
    pub valid: bool,
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    pub user: bool,
    pub global: bool,
    pub accessed: bool,
    pub dirty: bool,
    #[bits(2)]
    pub rsw: u8,
    #[bits(44)]
    pub ppn: u64,
    #[bits(10)]
    __: u16,
}

impl Sv39Entry {
    #[inline]
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.readable() || self.writable() || self.executable()
    }

    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.ppn() << 12)
    }
}

/// RISC-V Sv39 paging.
pub enum RiscvSv39 {}

impl PageTableFormat for RiscvSv39 {
    type Raw = u64;

    const NAME: &'static str = "RISC-V Sv39";
    const LEVELS: usize = 3;
    const ABSENT: u64 = 0;

    fn index_bits(_level: usize) -> u32 {
        9
    }

    #[allow(clippy::cast_possible_truncation)]
    fn index_shift(level: usize) -> u32 {
        30 - 9 * level as u32
    }

    fn decode(_level: usize, raw: u64) -> EntryKind {
        let e = Sv39Entry::from_bits(raw);
        if !e.valid() {
            return EntryKind::Absent;
        }
        if !e.is_leaf() {
            return EntryKind::Table(e.physical_address());
        }

        let mut permissions = PagePermissions::empty();
        permissions.set(PagePermissions::READ, e.readable());
        permissions.set(PagePermissions::WRITE, e.writable());
        permissions.set(PagePermissions::EXECUTE, e.executable());
        permissions.set(PagePermissions::USER, e.user());
        permissions.set(PagePermissions::GLOBAL, e.global());
        EntryKind::Leaf {
            frame: e.physical_address(),
            permissions,
        }
    }

    fn encode_table(_level: usize, table: PhysicalAddress) -> u64 {
        Sv39Entry::new()
            .with_valid(true)
            .with_ppn(table.as_u64() >> 12)
            .into_bits()
    }

    fn encode_leaf(_level: usize, frame: PhysicalAddress, permissions: PagePermissions) -> u64 {
        // W without R is reserved; an empty set still has to read as a leaf.
        let readable = permissions.contains(PagePermissions::READ)
            || permissions.contains(PagePermissions::WRITE)
            || !permissions.contains(PagePermissions::EXECUTE);
        Sv39Entry::new()
            .with_valid(true)
            .with_readable(readable)
            .with_writable(permissions.contains(PagePermissions::WRITE))
            .with_executable(permissions.contains(PagePermissions::EXECUTE))
            .with_user(permissions.contains(PagePermissions::USER))
            .with_global(permissions.contains(PagePermissions::GLOBAL))
            .with_accessed(true)
            .with_dirty(permissions.contains(PagePermissions::WRITE))
            .with_ppn(frame.as_u64() >> 12)
            .into_bits()
    }

    fn leaf_allowed(level: usize) -> bool {
        level < Self::LEVELS
    }
}
