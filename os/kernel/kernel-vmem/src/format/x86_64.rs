//! x86-64 four-level paging (PML4 → PDPT → PD → PT).

use super::{EntryKind, PageTableFormat};
use crate::PagePermissions;
use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, align_down};

/// A single 64-bit x86-64 page table entry in its raw bitfield form.
///
/// This structure models the **common superset** of fields found in all
/// four paging levels (PML4E, PDPTE, PDE, PTE).
///
/// ### Bit layout (canonical)
///
/// | Bits      | Name / Mnemonic   | Meaning |
/// |-----------|-------------------|----------|
/// | 0         | `P` (present)     | Valid entry if set |
/// | 1         | `RW`              | Writable if set |
/// | 2         | `US`              | User-mode accessible if set |
/// | 3         | `PWT`             | Write-through caching |
/// | 4         | `PCD`             | Disable caching |
/// | 5         | `A`               | Accessed |
/// | 6         | `D`               | Dirty (leaf only) |
/// | 7         | `PS`              | Large page flag |
/// | 8         | `G`               | Global (leaf only) |
/// | 9–11      | OS avail low      | Reserved for OS use |
/// | 12–51     | `addr`            | Physical frame bits [51:12] |
/// | 52–58     | OS avail high     | Reserved for OS use |
/// | 59–62     | `PKU` / OS use    | Protection key or OS use |
/// | 63        | `NX`              | Execute disable |
///
/// ### Notes
/// - `PS` must be 0 in PML4 and PT entries; valid in PDPT (1 GiB) and PD (2 MiB).
/// - For large pages bit 12 is the PAT bit; the frame address is the entry
///   address aligned down to the page size.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct X86Entry64 {
    /// Present (P, bit 0).
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU.
    pub accessed: bool,

    /// Dirty (D, bit 6). Set by the CPU on first write to a leaf.
    pub dirty: bool,

    /// Page Size (PS, bit 7).
    pub large_page: bool,

    /// Global (G, bit 8).
    pub global_translation: bool,

    /// OS-available low bits (9–11).
    #[bits(3)]
    pub os_available_low: u8,

    /// Physical address bits [51:12].
    #[bits(40)]
    pub phys_addr_bits_51_12: u64,

    /// OS-available high bits (52–58).
    #[bits(7)]
    pub os_available_high: u8,

    /// Protection Key / OS use (59–62).
    #[bits(4)]
    pub protection_key: u8,

    /// No-Execute (NX, bit 63).
    pub no_execute: bool,
}

impl X86Entry64 {
    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.phys_addr_bits_51_12() << 12)
    }

    #[inline]
    pub const fn set_physical_address(&mut self, pa: PhysicalAddress) {
        self.set_phys_addr_bits_51_12(pa.as_u64() >> 12);
    }
}

/// x86-64 four-level paging with 4 KiB, 2 MiB and 1 GiB pages.
pub enum X86FourLevel {}

impl PageTableFormat for X86FourLevel {
    type Raw = u64;

    const NAME: &'static str = "x86-64 (4-level)";
    const LEVELS: usize = 4;
    const ABSENT: u64 = 0;

    fn index_bits(_level: usize) -> u32 {
        9
    }

    #[allow(clippy::cast_possible_truncation)]
    fn index_shift(level: usize) -> u32 {
        39 - 9 * level as u32
    }

    fn decode(level: usize, raw: u64) -> EntryKind {
        let e = X86Entry64::from_bits(raw);
        if !e.present() {
            return EntryKind::Absent;
        }
        let is_leaf = level == Self::last_level() || (e.large_page() && Self::leaf_allowed(level));
        if !is_leaf {
            return EntryKind::Table(e.physical_address());
        }

        let mut permissions = PagePermissions::READ;
        permissions.set(PagePermissions::WRITE, e.writable());
        permissions.set(PagePermissions::USER, e.user_access());
        permissions.set(PagePermissions::GLOBAL, e.global_translation());
        permissions.set(PagePermissions::EXECUTE, !e.no_execute());
        EntryKind::Leaf {
            frame: PhysicalAddress::new(align_down(e.physical_address().as_u64(), Self::leaf_span(level))),
            permissions,
        }
    }

    fn encode_table(_level: usize, table: PhysicalAddress) -> u64 {
        let mut e = X86Entry64::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true);
        e.set_physical_address(table);
        e.into_bits()
    }

    fn encode_leaf(level: usize, frame: PhysicalAddress, permissions: PagePermissions) -> u64 {
        debug_assert!(Self::leaf_allowed(level));
        let mut e = X86Entry64::new()
            .with_present(true)
            .with_writable(permissions.contains(PagePermissions::WRITE))
            .with_user_access(permissions.contains(PagePermissions::USER))
            .with_global_translation(permissions.contains(PagePermissions::GLOBAL))
            .with_no_execute(!permissions.contains(PagePermissions::EXECUTE))
            .with_large_page(level != Self::last_level());
        e.set_physical_address(frame);
        e.into_bits()
    }

    fn leaf_allowed(level: usize) -> bool {
        (1..Self::LEVELS).contains(&level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_mib_leaf_round_trip() {
        let pa = PhysicalAddress::new(0x0000_0012_3440_0000);
        let raw = X86FourLevel::encode_leaf(2, pa, PagePermissions::USER_DATA);
        let e = X86Entry64::from_bits(raw);
        assert!(e.present() && e.large_page() && e.no_execute() && e.user_access());
        assert_eq!(
            X86FourLevel::decode(2, raw),
            EntryKind::Leaf {
                frame: pa,
                permissions: PagePermissions::USER_DATA
            }
        );
    }

    #[test]
    fn pml4_never_holds_leaves() {
        assert!(!X86FourLevel::leaf_allowed(0));
        // PS in a PML4E is reserved; it still reads as a table pointer.
        let raw = X86Entry64::new()
            .with_present(true)
            .with_large_page(true)
            .with_phys_addr_bits_51_12(0x42)
            .into_bits();
        assert_eq!(
            X86FourLevel::decode(0, raw),
            EntryKind::Table(PhysicalAddress::new(0x42_000))
        );
    }

    #[test]
    fn executable_text_clears_nx() {
        let raw = X86FourLevel::encode_leaf(3, PhysicalAddress::new(0x5000), PagePermissions::KERNEL_TEXT);
        assert!(!X86Entry64::from_bits(raw).no_execute());
        assert!(!X86Entry64::from_bits(raw).large_page());
    }
}
