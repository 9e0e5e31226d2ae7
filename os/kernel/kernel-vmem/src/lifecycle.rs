//! # Page-Table Lifecycle
//!
//! Tearing down page-table trees. Only the table structure is released;
//! frames mapped by leaf entries belong to whoever mapped them.

use crate::format::{EntryKind, PageTableFormat};
use crate::walker::PageTableWalker;
use crate::{FrameSource, PhysMapper};
use kernel_memory_addresses::{Pfn, PhysicalAddress, VirtualAddress};
use log::trace;
use thiserror::Error;

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum RemoveTableError {
    #[error("no page table covers the address")]
    NotMapped,
    #[error("the address is mapped by a huge leaf, not a page table")]
    HugeLeaf,
}

impl<F, M, S> PageTableWalker<'_, F, M, S>
where
    F: PageTableFormat,
    M: PhysMapper,
    S: FrameSource,
{
    /// Release every table of the tree rooted at `root`, then the root.
    ///
    /// Each interior entry is cleared and its child frame decref'd once, so a
    /// frame holding packed sibling tables is released with its last sibling.
    /// Root entries at and above the root index of `kernel_base` are shared
    /// kernel mappings and are left alone.
    ///
    /// # Preconditions
    /// The tree must not be the active translation on any core and must not be
    /// walked again afterwards.
    pub fn destroy(&self, root: Pfn, kernel_base: Option<VirtualAddress>) {
        let limit = kernel_base.map_or(F::entries(0), |va| F::index(0, va));
        let released = self.release_children(root.base(), 0, limit);
        self.frames.decref(root);
        trace!("{}: destroyed tree at {} ({released} tables)", F::NAME, root.base());
    }

    /// Unlink and release the empty last-level table that covers `va`.
    ///
    /// # Errors
    /// - [`RemoveTableError::NotMapped`] if no such table exists.
    /// - [`RemoveTableError::HugeLeaf`] if a leaf maps `va` above the last level.
    ///
    /// # Panics
    /// If the table still holds any entry.
    pub fn remove_table(&self, root: Pfn, va: VirtualAddress) -> Result<(), RemoveTableError> {
        let last = F::last_level();
        let mut table = root.base();
        for level in 0..last - 1 {
            match self.slot(table, level, F::index(level, va)).kind() {
                EntryKind::Table(next) => table = next,
                EntryKind::Leaf { .. } => return Err(RemoveTableError::HugeLeaf),
                EntryKind::Absent => return Err(RemoveTableError::NotMapped),
            }
        }

        let parent = self.slot(table, last - 1, F::index(last - 1, va));
        let pt = match parent.kind() {
            EntryKind::Table(pt) => pt,
            EntryKind::Leaf { .. } => return Err(RemoveTableError::HugeLeaf),
            EntryKind::Absent => return Err(RemoveTableError::NotMapped),
        };

        let in_use = (0..F::entries(last)).any(|i| !self.slot(pt, last, i).kind().is_absent());
        assert!(!in_use, "removing page table {pt} for {va} which still holds entries");

        parent.clear();
        self.frames.decref(pt.pfn());
        Ok(())
    }

    /// Release the children of the level-`level` table at `table`, looking at
    /// entries `0..limit`. Returns the number of table entries released.
    fn release_children(&self, table: PhysicalAddress, level: usize, limit: usize) -> usize {
        let child_level = level + 1;
        let mut released = 0;
        for index in 0..limit {
            let slot = self.slot(table, level, index);
            let EntryKind::Table(child) = slot.kind() else {
                continue;
            };
            if child_level < F::last_level() {
                released += self.release_children(child, child_level, F::entries(child_level));
            }
            slot.clear();
            self.frames.decref(child.pfn());
            released += 1;
        }
        released
    }
}
