//! # Boot-Time Memory Classification
//!
//! Turns what the firmware reports into the usable frame ranges handed to
//! [`PhysicalMemoryManager::init`](crate::PhysicalMemoryManager::init).
//!
//! ```text
//!  0        1 MiB      boot_free_end                  max_phys
//!  ├─ low ──┼─ kernel ──┤░░░░░░░ usable ░░░░░░│ hole │░░░░░│
//!  └────── always busy ─┘                      └busy─┘
//! ```
//!
//! Everything below the end of the boot allocations (kernel image, frame
//! table, early page tables) stays busy. Without a memory map, memory up to
//! the IO hole and above 4 GiB is *assumed* usable.

use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, Pfn, PfnRange, align_up};
use log::{info, warn};

/// Firmware classification of a physical region.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Usable,
    Reserved,
    AcpiReclaimable,
    AcpiNvs,
    Defective,
}

/// One entry of a firmware memory map.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base: PhysicalAddress,
    pub len: u64,
    pub kind: RegionKind,
}

impl MemoryRegion {
    #[must_use]
    pub const fn new(base: PhysicalAddress, len: u64, kind: RegionKind) -> Self {
        Self { base, len, kind }
    }

    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base.as_u64().saturating_add(self.len))
    }
}

/// First frame not used by boot allocations.
const fn first_unused(boot_free_end: PhysicalAddress) -> Pfn {
    PhysicalAddress::new(align_up(boot_free_end.as_u64(), PAGE_SIZE)).pfn()
}

/// Usable frames of a firmware memory map.
///
/// Only whole frames of [`RegionKind::Usable`] regions count; frames below
/// `boot_free_end` are dropped.
pub fn usable_ranges(
    regions: &[MemoryRegion],
    boot_free_end: PhysicalAddress,
) -> impl Iterator<Item = PfnRange> + '_ {
    let busy_end = first_unused(boot_free_end);
    regions
        .iter()
        .filter(|r| r.kind == RegionKind::Usable)
        .map(move |r| {
            let frames = PfnRange::from_phys(r.base, r.end());
            PfnRange::new(frames.start().max(busy_end), frames.end())
        })
        .filter(|r| !r.is_empty())
}

/// Highest physical address a memory map reports (any kind).
#[must_use]
pub fn max_physical_address(regions: &[MemoryRegion]) -> PhysicalAddress {
    regions
        .iter()
        .map(MemoryRegion::end)
        .max()
        .unwrap_or(PhysicalAddress::zero())
}

/// Usable frames when the firmware gave no memory map.
///
/// Assumes `[boot_free_end, hole)` and `[hole end, max_phys)` are RAM. This
/// may lose memory on machines with a different layout.
#[must_use]
pub fn fallback_usable_ranges(
    boot_free_end: PhysicalAddress,
    max_phys: PhysicalAddress,
    io_hole: PfnRange,
) -> [PfnRange; 2] {
    warn!("no memory map; assuming RAM up to {max_phys} around the IO hole");

    let top = max_phys.pfn();
    let low = PfnRange::new(first_unused(boot_free_end), top.min(io_hole.start()));
    let high = PfnRange::new(io_hole.end(), top);
    info!("fallback usable frames: {low:?}, {high:?}");
    [low, high]
}
