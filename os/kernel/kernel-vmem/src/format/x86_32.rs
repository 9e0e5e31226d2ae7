//! 32-bit x86 paging without PAE: a page directory of 1024 entries, each
//! pointing at a page table of 1024 entries or mapping a 4 MiB page (PS).

use super::{EntryKind, PageTableFormat};
use crate::PagePermissions;
use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, align_down};

/// A 32-bit x86 page-directory or page-table entry.
///
/// | Bits  | Name          | Meaning |
/// |-------|---------------|---------|
/// | 0     | `P`           | Present |
/// | 1     | `RW`          | Writable |
/// | 2     | `US`          | User accessible |
/// | 3     | `PWT`         | Write-through |
/// | 4     | `PCD`         | Cache disabled |
/// | 5     | `A`           | Accessed |
/// | 6     | `D`           | Dirty (leaf only) |
/// | 7     | `PS`          | 4 MiB page (directory entries only) |
/// | 8     | `G`           | Global (leaf only) |
/// | 9–11  | OS available  | Ignored by hardware |
/// | 12–31 | `addr`        | Physical frame bits [31:12] |
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct X86Entry32 {
    pub present: bool,
    pub writable: bool,
    pub user_access: bool,
    pub write_through: bool,
    pub cache_disabled: bool,
    pub accessed: bool,
    pub dirty: bool,
    pub large_page: bool,
    pub global_translation: bool,
    #[bits(3)]
    pub os_available: u8,
    #[bits(20)]
    pub phys_addr_bits_31_12: u32,
}

impl X86Entry32 {
    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new((self.phys_addr_bits_31_12() as u64) << 12)
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn set_physical_address(&mut self, pa: PhysicalAddress) {
        self.set_phys_addr_bits_31_12((pa.as_u64() >> 12) as u32);
    }
}

/// Two-level 32-bit x86 paging.
pub enum X86TwoLevel {}

impl PageTableFormat for X86TwoLevel {
    type Raw = u32;

    const NAME: &'static str = "x86 (2-level)";
    const LEVELS: usize = 2;
    const ABSENT: u32 = 0;

    fn index_bits(_level: usize) -> u32 {
        10
    }

    fn index_shift(level: usize) -> u32 {
        if level == 0 { 22 } else { 12 }
    }

    fn decode(level: usize, raw: u32) -> EntryKind {
        let e = X86Entry32::from_bits(raw);
        if !e.present() {
            return EntryKind::Absent;
        }
        if level == 0 && !e.large_page() {
            return EntryKind::Table(e.physical_address());
        }

        let mut permissions = PagePermissions::READ | PagePermissions::EXECUTE;
        permissions.set(PagePermissions::WRITE, e.writable());
        permissions.set(PagePermissions::USER, e.user_access());
        permissions.set(PagePermissions::GLOBAL, e.global_translation());
        EntryKind::Leaf {
            frame: PhysicalAddress::new(align_down(e.physical_address().as_u64(), Self::leaf_span(level))),
            permissions,
        }
    }

    fn encode_table(_level: usize, table: PhysicalAddress) -> u32 {
        // Permissions are enforced at the leaves; directories grant everything.
        let mut e = X86Entry32::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true);
        e.set_physical_address(table);
        e.into_bits()
    }

    fn encode_leaf(level: usize, frame: PhysicalAddress, permissions: PagePermissions) -> u32 {
        debug_assert!(Self::leaf_allowed(level));
        let mut e = X86Entry32::new()
            .with_present(true)
            .with_writable(permissions.contains(PagePermissions::WRITE))
            .with_user_access(permissions.contains(PagePermissions::USER))
            .with_global_translation(permissions.contains(PagePermissions::GLOBAL))
            .with_large_page(level == 0);
        e.set_physical_address(frame);
        e.into_bits()
    }

    fn leaf_allowed(level: usize) -> bool {
        level < Self::LEVELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_entries_point_at_tables() {
        let raw = X86TwoLevel::encode_table(0, PhysicalAddress::new(0x0012_3000));
        assert_eq!(raw, 0x0012_3007);
        assert_eq!(
            X86TwoLevel::decode(0, raw),
            EntryKind::Table(PhysicalAddress::new(0x0012_3000))
        );
    }

    #[test]
    fn large_page_is_a_leaf_at_the_directory() {
        let raw = X86TwoLevel::encode_leaf(0, PhysicalAddress::new(0x0080_0000), PagePermissions::KERNEL_DATA);
        assert_eq!(raw & (1 << 7), 1 << 7);
        match X86TwoLevel::decode(0, raw) {
            EntryKind::Leaf { frame, permissions } => {
                assert_eq!(frame, PhysicalAddress::new(0x0080_0000));
                assert!(permissions.contains(PagePermissions::WRITE | PagePermissions::EXECUTE));
                assert!(!permissions.contains(PagePermissions::USER));
            }
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    #[test]
    fn absent_is_zero() {
        assert_eq!(X86TwoLevel::decode(1, X86TwoLevel::ABSENT), EntryKind::Absent);
        assert_eq!(X86TwoLevel::decode(0, 0xFFFF_F000), EntryKind::Absent);
    }
}
