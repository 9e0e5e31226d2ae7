//! # Virtual Memory Support
//!
//! Architecture-pluggable page-table walking and teardown for the physical
//! memory manager.
//!
//! ## What you get
//! - A [`PageTableFormat`] capability describing one hardware radix tree, with
//!   implementations for [32-bit x86](X86TwoLevel), [x86-64](X86FourLevel),
//!   the [SPARC reference MMU](SparcSrmmu) and [RISC-V Sv39](RiscvSv39).
//! - A [`PageTableWalker`] that finds (and optionally creates) the entry
//!   translating a virtual address.
//! - Tree teardown ([`PageTableWalker::destroy`]) and single-table removal
//!   ([`PageTableWalker::remove_table`]).
//! - Architecture-neutral [`PagePermissions`] for leaf mappings.
//! - A tiny mapper/frame interface ([`PhysMapper`], [`FrameSource`]).
//!
//! ## Virtual Address → Physical Address Walk
//!
//! Every format splits a virtual address into one index per level plus the
//! page offset. For x86-64:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! and for the SPARC SRMMU:
//!
//! ```text
//! | 31‒24 | 23‒18 | 17‒12 | 11‒0   |
//! |  L1   |  L2   |  L3   | Offset |
//! ```
//!
//! The walker consumes one index per level. A **leaf** met above the last
//! level (PS pages on x86, PTEs at any SRMMU/Sv39 level) ends the walk early.
//!
//! ## Frame ownership
//!
//! Table frames are reference counted by the [`FrameSource`]. A frame handed
//! out by [`FrameSource::alloc_table_frame`] carries one reference; formats
//! that pack several tables into one frame add one reference per additional
//! sibling table. [`PageTableWalker::destroy`] drops one reference per table
//! entry, so frames return to the allocator exactly when their last table is
//! gone.
//!
//! ```rust
//! # use kernel_vmem::*;
//! # use kernel_memory_addresses::*;
//! # use core::cell::{Cell, UnsafeCell};
//! # #[repr(align(4096))] struct Frame([u8; 4096]);
//! # struct Ram(Vec<UnsafeCell<Frame>>);
//! # impl PhysMapper for Ram {
//! #     unsafe fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
//! #         unsafe { self.0[pa.pfn().as_usize()].get().cast::<u8>().add(pa.page_offset() as usize).cast() }
//! #     }
//! # }
//! # struct Bump(Cell<usize>);
//! # impl FrameSource for Bump {
//! #     fn alloc_table_frame(&self) -> Option<Pfn> { let n = self.0.get(); self.0.set(n + 1); (n < 8).then(|| Pfn::new(n)) }
//! #     fn incref(&self, _: Pfn) {}
//! #     fn decref(&self, _: Pfn) {}
//! # }
//! # let ram = Ram((0..8).map(|_| UnsafeCell::new(Frame([0; 4096]))).collect());
//! # let frames = Bump(Cell::new(0));
//! let walker = PageTableWalker::<X86FourLevel, _, _>::new(&ram, &frames);
//! let root = walker.create_root()?;
//!
//! let va = VirtualAddress::new(0xFFFF_8000_0000_0000);
//! walker
//!     .walk(root, va, true)?
//!     .install_leaf(PhysicalAddress::new(0x3000), PagePermissions::KERNEL_DATA);
//!
//! assert_eq!(walker.translate(root, va + 8), Some(PhysicalAddress::new(0x3008)));
//! walker.destroy(root, None);
//! # Ok::<(), WalkError>(())
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

pub mod format;
mod lifecycle;
mod permissions;
#[cfg(test)]
mod testing;
mod walker;

pub use crate::format::{EntryKind, PageTableFormat, RiscvSv39, SparcSrmmu, X86FourLevel, X86TwoLevel};
pub use crate::lifecycle::RemoveTableError;
pub use crate::permissions::PagePermissions;
pub use crate::walker::{EntrySlot, PageTableWalker, WalkError};

use kernel_memory_addresses::{Pfn, PhysicalAddress};

/// Source of physical frames for page tables.
///
/// The physical memory manager implements this; the walker never frees
/// frames directly, it only drops references.
pub trait FrameSource {
    /// Allocate one frame for a page table. The frame carries one reference.
    ///
    /// Returns `None` on out-of-memory.
    fn alloc_table_frame(&self) -> Option<Pfn>;

    /// Add a reference to an allocated frame.
    fn incref(&self, pfn: Pfn);

    /// Drop a reference; the frame is freed when the last one goes.
    fn decref(&self, pfn: Pfn);
}

/// Converts physical addresses to *temporarily* usable pointers in the current
/// virtual address space (e.g., via identity map or a higher-half direct map, HHDM).
///
/// Typical patterns:
/// - **Loader**: often identity-maps low memory; returns direct pointers.
/// - **Kernel**: uses HHDM; adds a constant offset before returning a pointer.
///
/// Page-table addresses may carry a sub-page offset (packed sibling tables);
/// implementations must preserve it.
pub trait PhysMapper {
    /// Convert a *physical* address to a pointer in the current address space.
    ///
    /// # Safety
    /// - `pa` must be mapped (writable) in the current page tables.
    /// - Type `T` must match the bytes at `pa`.
    unsafe fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T;

    /// Convert a *physical* address to a mutable reference.
    ///
    /// # Safety
    /// As for [`phys_to_ptr`](Self::phys_to_ptr); additionally no other
    /// reference to the same memory may be live for `'a`.
    #[inline]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        unsafe { &mut *self.phys_to_ptr::<T>(pa) }
    }
}
