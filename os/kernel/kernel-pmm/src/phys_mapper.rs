//! # HHDM-based PhysMapper
//!
//! With a higher-half direct map (HHDM) every physical address is visible at
//! `offset + pa`. Page-table walks over frames from the
//! [`PhysicalMemoryManager`](crate::PhysicalMemoryManager) go through this
//! mapper in the kernel; loaders with an identity map use an offset of 0.
//!
//! ## Example
//! ```rust
//! use kernel_memory_addresses::PhysicalAddress;
//! use kernel_pmm::phys_mapper::HhdmPhysMapper;
//! use kernel_vmem::PhysMapper;
//!
//! let mut table = [0u64; 512];
//! let mapper = HhdmPhysMapper::new(table.as_mut_ptr() as u64);
//! unsafe {
//!     let entry: &mut u64 = mapper.phys_to_mut(PhysicalAddress::new(8));
//!     *entry = 0x1003;
//! }
//! assert_eq!(table[1], 0x1003);
//! ```

use kernel_info::memory::HHDM_BASE;
use kernel_memory_addresses::PhysicalAddress;
use kernel_vmem::PhysMapper;

/// [`PhysMapper`] adding a constant offset to physical addresses.
///
/// # Safety
/// The direct map must be present and cover every address passed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HhdmPhysMapper {
    offset: u64,
}

impl HhdmPhysMapper {
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

impl Default for HhdmPhysMapper {
    /// The kernel's direct map at [`HHDM_BASE`].
    fn default() -> Self {
        Self::new(HHDM_BASE)
    }
}

impl PhysMapper for HhdmPhysMapper {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        self.offset.wrapping_add(pa.as_u64()) as usize as *mut T
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_offset_is_the_direct_map() {
        let m = HhdmPhysMapper::default();
        let p = unsafe { m.phys_to_ptr::<u8>(PhysicalAddress::new(0x1000)) };
        assert_eq!(p as u64, HHDM_BASE + 0x1000);
    }

    #[test]
    fn offset_mapper_reaches_memory() {
        let mut words = [0u32; 4];
        let m = HhdmPhysMapper::new(words.as_mut_ptr() as u64);
        unsafe { *m.phys_to_mut::<u32>(PhysicalAddress::new(12)) = 7 };
        assert_eq!(words, [0, 0, 0, 7]);
    }
}
