//! # Page Table Walker
//!
//! Walks a radix tree described by a [`PageTableFormat`] from its root frame
//! down to the entry that translates a virtual address, creating missing
//! intermediate tables on request.
//!
//! ```text
//!   root (level 0)          level 1              last level
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │ idx(0, va) ─┼──────►│ idx(1, va) ─┼─ ··· ►│ idx(n, va)  │ ◄─ returned slot
//!  └─────────────┘       └─────────────┘       └─────────────┘
//!                          (a leaf here ends the walk early)
//! ```
//!
//! ## Sibling-packed tables
//!
//! When a format packs several child tables into one frame (SPARC SRMMU), a
//! single allocation serves the whole aligned group of parent entries. Every
//! absent entry in the group gets one sub-table and one reference on the
//! shared frame; entries that are already populated keep what they have. The
//! frame's reference count therefore equals the number of live siblings.

use crate::format::{EntryKind, PageTableFormat};
use crate::{FrameSource, PagePermissions, PhysMapper};
use core::marker::PhantomData;
use core::ptr::NonNull;
use kernel_memory_addresses::{PAGE_SIZE, Pfn, PhysicalAddress, VirtualAddress};
use log::trace;
use thiserror::Error;

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum WalkError {
    /// An intermediate table is missing and creation was not requested.
    #[error("address is not mapped")]
    NotMapped,
    /// No frame was available for a new page table.
    #[error("out of memory while allocating a page table")]
    OutOfMemory,
}

/// Handle to one page-table entry inside a mapped table.
///
/// The handle stays valid as long as the table that contains it is not torn
/// down; it does not keep the table alive.
pub struct EntrySlot<'a, F: PageTableFormat> {
    ptr: NonNull<F::Raw>,
    level: usize,
    _table: PhantomData<&'a mut F::Raw>,
}

impl<F: PageTableFormat> EntrySlot<'_, F> {
    /// Raw pointer to the entry.
    #[inline]
    #[must_use]
    pub const fn as_ptr(&self) -> *mut F::Raw {
        self.ptr.as_ptr()
    }

    /// Level of the table holding this entry.
    #[inline]
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    #[inline]
    #[must_use]
    pub fn load(&self) -> F::Raw {
        // SAFETY: the pointer targets a live, aligned entry of a mapped table.
        unsafe { self.ptr.as_ptr().read_volatile() }
    }

    #[inline]
    pub fn store(&self, raw: F::Raw) {
        // SAFETY: see `load`.
        unsafe { self.ptr.as_ptr().write_volatile(raw) }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        F::decode(self.level, self.load())
    }

    #[inline]
    pub fn clear(&self) {
        self.store(F::ABSENT);
    }

    /// Map `frame` through this entry.
    ///
    /// # Panics
    /// If the format does not allow leaves at this entry's level.
    pub fn install_leaf(&self, frame: PhysicalAddress, permissions: PagePermissions) {
        assert!(
            F::leaf_allowed(self.level),
            "{} does not allow leaf entries at level {}",
            F::NAME,
            self.level
        );
        self.store(F::encode_leaf(self.level, frame, permissions));
    }
}

/// Walks and extends page tables of format `F`.
///
/// Table memory is reached through the [`PhysMapper`]; new table frames come
/// from the [`FrameSource`] with one reference each.
pub struct PageTableWalker<'a, F, M, S> {
    pub(crate) mapper: &'a M,
    pub(crate) frames: &'a S,
    _format: PhantomData<F>,
}

impl<'a, F, M, S> PageTableWalker<'a, F, M, S>
where
    F: PageTableFormat,
    M: PhysMapper,
    S: FrameSource,
{
    pub const fn new(mapper: &'a M, frames: &'a S) -> Self {
        Self {
            mapper,
            frames,
            _format: PhantomData,
        }
    }

    /// Allocate and zero a root table.
    ///
    /// # Errors
    /// [`WalkError::OutOfMemory`] if no frame is available.
    pub fn create_root(&self) -> Result<Pfn, WalkError> {
        let pfn = self.frames.alloc_table_frame().ok_or(WalkError::OutOfMemory)?;
        self.zero_frame(pfn);
        trace!("{}: new root table at {}", F::NAME, pfn.base());
        Ok(pfn)
    }

    /// Find the entry translating `va`.
    ///
    /// Returns the last-level entry, or the interior entry of a huge/jumbo
    /// leaf if one is met on the way. With `create`, missing intermediate
    /// tables are allocated, zeroed and linked in.
    ///
    /// # Errors
    /// - [`WalkError::NotMapped`] if a table is missing and `create` is false.
    /// - [`WalkError::OutOfMemory`] if a needed table could not be allocated.
    pub fn walk(&self, root: Pfn, va: VirtualAddress, create: bool) -> Result<EntrySlot<'a, F>, WalkError> {
        let last = F::last_level();
        let mut table = root.base();
        for level in 0..last {
            let slot = self.slot(table, level, F::index(level, va));
            match slot.kind() {
                EntryKind::Leaf { .. } => return Ok(slot),
                EntryKind::Table(next) => table = next,
                EntryKind::Absent if create => table = self.create_table(table, level, va)?,
                EntryKind::Absent => return Err(WalkError::NotMapped),
            }
        }
        Ok(self.slot(table, last, F::index(last, va)))
    }

    /// Physical address `va` translates to, if mapped.
    #[must_use]
    pub fn translate(&self, root: Pfn, va: VirtualAddress) -> Option<PhysicalAddress> {
        let slot = self.walk(root, va, false).ok()?;
        match slot.kind() {
            EntryKind::Leaf { frame, .. } => Some(frame + (va.as_u64() & (F::leaf_span(slot.level()) - 1))),
            _ => None,
        }
    }

    /// Permissions of the leaf mapping `va`, if mapped.
    #[must_use]
    pub fn permissions(&self, root: Pfn, va: VirtualAddress) -> Option<PagePermissions> {
        match self.walk(root, va, false).ok()?.kind() {
            EntryKind::Leaf { permissions, .. } => Some(permissions),
            _ => None,
        }
    }

    /// Allocate the child table for entry `F::index(level, va)` of `table`.
    ///
    /// Returns the physical address of the child table the walk continues in.
    fn create_table(&self, table: PhysicalAddress, level: usize, va: VirtualAddress) -> Result<PhysicalAddress, WalkError> {
        let child = level + 1;
        let per_frame = F::tables_per_frame(child);
        let index = F::index(level, va);

        let pfn = self.frames.alloc_table_frame().ok_or(WalkError::OutOfMemory)?;
        self.zero_frame(pfn);

        if per_frame == 1 {
            self.slot(table, level, index).store(F::encode_table(level, pfn.base()));
            trace!("{}: level {child} table at {} for {va}", F::NAME, pfn.base());
            return Ok(pfn.base());
        }

        let table_bytes = F::table_bytes(child) as u64;
        let first = index - index % per_frame;
        let mut installed = 0usize;
        for sibling in 0..per_frame {
            let slot = self.slot(table, level, first + sibling);
            if !slot.kind().is_absent() {
                continue;
            }
            slot.store(F::encode_table(level, pfn.base() + sibling as u64 * table_bytes));
            installed += 1;
        }

        // The allocation carries the first reference.
        for _ in 1..installed {
            self.frames.incref(pfn);
        }

        trace!(
            "{}: {installed} packed level {child} tables in {} for {va}",
            F::NAME,
            pfn.base()
        );
        Ok(pfn.base() + (index - first) as u64 * table_bytes)
    }

    /// Entry `index` of the table at `table`.
    pub(crate) fn slot(&self, table: PhysicalAddress, level: usize, index: usize) -> EntrySlot<'a, F> {
        debug_assert!(index < F::entries(level));
        // SAFETY: `table` is a page table reachable from a root handed to us,
        // and `index` is within its bounds.
        let ptr = unsafe { self.mapper.phys_to_ptr::<F::Raw>(table).add(index) };
        EntrySlot {
            ptr: NonNull::new(ptr).unwrap_or_else(|| panic!("PhysMapper returned null for {table}")),
            level,
            _table: PhantomData,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn zero_frame(&self, pfn: Pfn) {
        // SAFETY: the frame was just handed to us and is not referenced elsewhere.
        unsafe {
            let p = self.mapper.phys_to_ptr::<u8>(pfn.base());
            core::ptr::write_bytes(p, 0, PAGE_SIZE as usize);
        }
    }
}
