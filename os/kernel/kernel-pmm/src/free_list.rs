//! Per-color free lists threaded through the frame table.
//!
//! Links are frame indices stored in the descriptors themselves, so the
//! lists need no memory of their own.
//!
//! ```text
//!  color 2 ─► [#6] ◄──► [#10] ◄──► [#2] ─► NIL
//! ```

use crate::cache::MAX_COLORS;
use crate::frame::PageFrame;
use core::sync::atomic::Ordering;
use kernel_memory_addresses::Pfn;

/// End-of-list marker.
pub(crate) const NIL: u32 = u32::MAX;

#[derive(Copy, Clone)]
struct FreeList {
    head: u32,
    len: usize,
}

impl FreeList {
    const EMPTY: Self = Self { head: NIL, len: 0 };
}

/// One doubly linked list per color.
pub(crate) struct FreeListSet {
    lists: [FreeList; MAX_COLORS],
    colors: usize,
}

#[allow(clippy::cast_possible_truncation)]
const fn link(pfn: Pfn) -> u32 {
    pfn.as_usize() as u32
}

const fn unlink(raw: u32) -> Option<Pfn> {
    if raw == NIL { None } else { Some(Pfn::new(raw as usize)) }
}

impl FreeListSet {
    pub(crate) const fn new(colors: usize) -> Self {
        Self {
            lists: [FreeList::EMPTY; MAX_COLORS],
            colors,
        }
    }

    #[inline]
    pub(crate) const fn colors(&self) -> usize {
        self.colors
    }

    #[inline]
    pub(crate) const fn len(&self, color: usize) -> usize {
        self.lists[color].len
    }

    #[inline]
    pub(crate) const fn is_empty(&self, color: usize) -> bool {
        self.lists[color].len == 0
    }

    pub(crate) fn total(&self) -> usize {
        self.lists[..self.colors].iter().map(|l| l.len).sum()
    }

    pub(crate) fn push_front(&mut self, frames: &[PageFrame], color: usize, pfn: Pfn) {
        let list = &mut self.lists[color];
        let frame = &frames[pfn.as_usize()];
        frame.prev.store(NIL, Ordering::Relaxed);
        frame.next.store(list.head, Ordering::Relaxed);
        if let Some(old) = unlink(list.head) {
            frames[old.as_usize()].prev.store(link(pfn), Ordering::Relaxed);
        }
        list.head = link(pfn);
        list.len += 1;
    }

    pub(crate) fn pop_front(&mut self, frames: &[PageFrame], color: usize) -> Option<Pfn> {
        let pfn = unlink(self.lists[color].head)?;
        self.remove(frames, color, pfn);
        Some(pfn)
    }

    /// Unlink `pfn`, which must be on the list of `color`.
    pub(crate) fn remove(&mut self, frames: &[PageFrame], color: usize, pfn: Pfn) {
        let list = &mut self.lists[color];
        let frame = &frames[pfn.as_usize()];
        let next = frame.next.swap(NIL, Ordering::Relaxed);
        let prev = frame.prev.swap(NIL, Ordering::Relaxed);

        match unlink(prev) {
            Some(p) => frames[p.as_usize()].next.store(next, Ordering::Relaxed),
            None => {
                debug_assert_eq!(list.head, link(pfn), "frame {pfn} not on list of color {color}");
                list.head = next;
            }
        }
        if let Some(n) = unlink(next) {
            frames[n.as_usize()].prev.store(prev, Ordering::Relaxed);
        }
        list.len -= 1;
    }

    /// Walk the list of `color` from the head.
    pub(crate) fn iter<'a>(&self, frames: &'a [PageFrame], color: usize) -> impl Iterator<Item = Pfn> + 'a {
        let mut cursor = unlink(self.lists[color].head);
        core::iter::from_fn(move || {
            let pfn = cursor?;
            cursor = unlink(frames[pfn.as_usize()].next.load(Ordering::Relaxed));
            Some(pfn)
        })
    }

    /// Back link of a listed frame.
    pub(crate) fn prev_of(frames: &[PageFrame], pfn: Pfn) -> Option<Pfn> {
        unlink(frames[pfn.as_usize()].prev.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> Vec<PageFrame> {
        (0..n).map(|_| PageFrame::new()).collect()
    }

    fn collect(set: &FreeListSet, frames: &[PageFrame], color: usize) -> Vec<usize> {
        set.iter(frames, color).map(Pfn::as_usize).collect()
    }

    #[test]
    fn push_is_lifo() {
        let frames = table(8);
        let mut set = FreeListSet::new(2);
        for p in [0, 2, 4] {
            set.push_front(&frames, 0, Pfn::new(p));
        }
        assert_eq!(collect(&set, &frames, 0), [4, 2, 0]);
        assert_eq!(set.pop_front(&frames, 0), Some(Pfn::new(4)));
        assert_eq!(set.len(0), 2);
        assert!(set.is_empty(1));
        assert_eq!(set.pop_front(&frames, 1), None);
    }

    #[test]
    fn remove_from_middle_head_and_tail() {
        let frames = table(8);
        let mut set = FreeListSet::new(1);
        for p in 0..5 {
            set.push_front(&frames, 0, Pfn::new(p));
        }
        // 4 3 2 1 0
        set.remove(&frames, 0, Pfn::new(2));
        assert_eq!(collect(&set, &frames, 0), [4, 3, 1, 0]);
        set.remove(&frames, 0, Pfn::new(4));
        assert_eq!(collect(&set, &frames, 0), [3, 1, 0]);
        set.remove(&frames, 0, Pfn::new(0));
        assert_eq!(collect(&set, &frames, 0), [3, 1]);
        assert_eq!(FreeListSet::prev_of(&frames, Pfn::new(1)), Some(Pfn::new(3)));
        assert_eq!(FreeListSet::prev_of(&frames, Pfn::new(3)), None);
        assert_eq!(set.total(), 2);
    }
}
