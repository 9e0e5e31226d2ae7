//! SPARC reference MMU: three levels with 256/64/64 entries of 32 bits.
//!
//! Second- and third-level tables are only 256 bytes long, so sixteen of them
//! are packed into one 4 KiB frame. Every level can hold a leaf (PTE): 16 MiB
//! at the root, 256 KiB at level 1 and 4 KiB at level 2.
//!
//! Entry type (`ET`, bits 1:0): `0` invalid, `1` page table descriptor (PTD),
//! `2` page table entry (PTE).
//!
//! ```text
//! PTD: | 31 ............................. 2 | 1 0 |
//!      |   table physical address >> 6     | 0 1 |
//!
//! PTE: | 31 ........... 8 | 7 | 6 | 5 | 4 2 | 1 0 |
//!      |  PPN (pa >> 12)  | C | M | R | ACC | 1 0 |
//! ```

use super::{EntryKind, PageTableFormat};
use crate::PagePermissions;
use kernel_memory_addresses::PhysicalAddress;

const ET_MASK: u32 = 0b11;
const ET_PTD: u32 = 1;
const ET_PTE: u32 = 2;
const ACC_SHIFT: u32 = 2;
const ACC_MASK: u32 = 0b111;
const PTE_CACHEABLE: u32 = 1 << 7;

/// SPARC V8 SRMMU three-level paging.
pub enum SparcSrmmu {}

impl SparcSrmmu {
    /// Map neutral permissions onto the 3-bit `ACC` field.
    ///
    /// Supervisor-only mappings can only be RX (6) or RWX (7).
    const fn access_code(p: PagePermissions) -> u32 {
        let w = p.contains(PagePermissions::WRITE);
        let x = p.contains(PagePermissions::EXECUTE);
        if !p.contains(PagePermissions::USER) {
            return if w { 7 } else { 6 };
        }
        match (w, x) {
            (true, true) => 3,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 0,
        }
    }

    const fn permissions_of(acc: u32) -> PagePermissions {
        use PagePermissions as P;
        match acc {
            0 | 5 => P::READ.union(P::USER),
            1 => P::READ.union(P::WRITE).union(P::USER),
            2 => P::READ.union(P::EXECUTE).union(P::USER),
            3 => P::READ.union(P::WRITE).union(P::EXECUTE).union(P::USER),
            4 => P::EXECUTE.union(P::USER),
            6 => P::READ.union(P::EXECUTE),
            _ => P::READ.union(P::WRITE).union(P::EXECUTE),
        }
    }
}

impl PageTableFormat for SparcSrmmu {
    type Raw = u32;

    const NAME: &'static str = "SPARC SRMMU";
    const LEVELS: usize = 3;
    const ABSENT: u32 = 0;

    fn index_bits(level: usize) -> u32 {
        if level == 0 { 8 } else { 6 }
    }

    fn index_shift(level: usize) -> u32 {
        match level {
            0 => 24,
            1 => 18,
            _ => 12,
        }
    }

    fn decode(_level: usize, raw: u32) -> EntryKind {
        match raw & ET_MASK {
            ET_PTD => EntryKind::Table(PhysicalAddress::new(u64::from(raw & !ET_MASK) << 4)),
            ET_PTE => EntryKind::Leaf {
                frame: PhysicalAddress::new(u64::from(raw >> 8) << 12),
                permissions: Self::permissions_of((raw >> ACC_SHIFT) & ACC_MASK),
            },
            _ => EntryKind::Absent,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_table(_level: usize, table: PhysicalAddress) -> u32 {
        debug_assert_eq!(table.as_u64() & 0x3f, 0, "PTD targets are 64-byte aligned");
        (((table.as_u64() >> 6) as u32) << 2) | ET_PTD
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_leaf(_level: usize, frame: PhysicalAddress, permissions: PagePermissions) -> u32 {
        (((frame.as_u64() >> 12) as u32) << 8)
            | PTE_CACHEABLE
            | (Self::access_code(permissions) << ACC_SHIFT)
            | ET_PTE
    }

    fn leaf_allowed(level: usize) -> bool {
        level < Self::LEVELS
    }
}
