use kernel_info::memory::{EXTPHYSMEM, IO_HOLE_END, IO_HOLE_START};
use kernel_memory_addresses::{PAGE_SHIFT, PhysicalAddress, PfnRange};

/// Boot-time parameters of the [`PhysicalMemoryManager`](crate::PhysicalMemoryManager).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PmmConfig {
    /// Frames covered by the frame table.
    pub max_frames: usize,
    /// Everything below this address is never handed out.
    pub low_memory_end: PhysicalAddress,
    /// Range that stays reserved even if reported usable.
    pub io_hole: Option<PfnRange>,
    /// Use the last-level cache's colors. Without it there is one free list.
    pub coloring: bool,
}

impl PmmConfig {
    /// PC layout for `total_bytes` of physical memory: the first megabyte
    /// (real-mode memory, BIOS and device windows) is reserved.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn for_memory(total_bytes: u64) -> Self {
        Self {
            max_frames: (total_bytes >> PAGE_SHIFT) as usize,
            low_memory_end: PhysicalAddress::new(EXTPHYSMEM),
            io_hole: None,
            coloring: true,
        }
    }

    /// No low-memory or hole reservations.
    #[must_use]
    pub const fn unrestricted(max_frames: usize) -> Self {
        Self {
            max_frames,
            low_memory_end: PhysicalAddress::zero(),
            io_hole: None,
            coloring: true,
        }
    }

    /// Also reserve the 32-bit PCI window `[3 GiB, 4 GiB)`.
    #[must_use]
    pub const fn with_legacy_io_hole(mut self) -> Self {
        self.io_hole = Some(legacy_io_hole());
        self
    }

    #[must_use]
    pub const fn with_io_hole(mut self, hole: PfnRange) -> Self {
        self.io_hole = Some(hole);
        self
    }

    #[must_use]
    pub const fn with_coloring(mut self, coloring: bool) -> Self {
        self.coloring = coloring;
        self
    }
}

/// Frames of the 32-bit PCI window below 4 GiB.
#[must_use]
pub const fn legacy_io_hole() -> PfnRange {
    PfnRange::from_phys(PhysicalAddress::new(IO_HOLE_START), PhysicalAddress::new(IO_HOLE_END))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::Pfn;

    #[test]
    fn pc_layout() {
        let c = PmmConfig::for_memory(8 << 30).with_legacy_io_hole();
        assert_eq!(c.max_frames, 2 * 1024 * 1024);
        assert_eq!(c.low_memory_end.pfn(), Pfn::new(0x100));
        assert_eq!(
            c.io_hole,
            Some(PfnRange::new(Pfn::new(0xC_0000), Pfn::new(0x10_0000)))
        );
        assert!(!c.with_coloring(false).coloring);
    }
}
