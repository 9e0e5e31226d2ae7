//! The physical memory manager.

use crate::cache::{CacheLevel, CacheTopology, overlapping_colors};
use crate::colors::ColorMap;
use crate::config::PmmConfig;
use crate::error::AllocError;
use crate::frame::{PageFlags, PageFrame};
use crate::free_list::{FreeListSet, NIL};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use kernel_memory_addresses::{PAGE_SIZE, Pfn, PfnRange, PhysicalAddress, align_up};
use kernel_sync::SpinMutex;
use kernel_vmem::FrameSource;
use log::{debug, info, trace};

/// Owner of all physical frames.
///
/// Created once at boot over the frame table and shared by reference. All
/// free-list mutations happen under one interrupt-safe spin lock; reference
/// counts are atomics, so only transitions to and from zero take the lock.
///
/// Every allocation hands out a frame with **one** reference. The frame goes
/// back to its color's free list when the last reference is dropped.
pub struct PhysicalMemoryManager<'t> {
    frames: &'t [PageFrame],
    config: PmmConfig,
    topology: CacheTopology,
    num_colors: usize,
    free: SpinMutex<FreeListSet>,
    next_color: AtomicUsize,
    initialized: AtomicBool,
}

impl<'t> PhysicalMemoryManager<'t> {
    /// Set up the manager over `frames`, which must cover `config.max_frames`.
    ///
    /// No frame is free until [`init`](Self::init) runs.
    ///
    /// # Panics
    /// If the frame table is too small or too large to be linked by index.
    #[must_use]
    pub fn new(frames: &'t [PageFrame], topology: CacheTopology, config: PmmConfig) -> Self {
        assert!(
            frames.len() >= config.max_frames,
            "frame table holds {} frames, {} required",
            frames.len(),
            config.max_frames
        );
        assert!(
            config.max_frames < NIL as usize,
            "{} frames cannot be linked by 32-bit index",
            config.max_frames
        );

        let num_colors = if cfg!(feature = "page-coloring") && config.coloring {
            topology.llc_colors()
        } else {
            1
        };
        topology.log_properties();
        debug!("pmm: {} frames, {num_colors} colors", config.max_frames);

        Self {
            frames,
            config,
            topology,
            num_colors,
            free: SpinMutex::new(FreeListSet::new(num_colors)),
            next_color: AtomicUsize::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    /// Link every frame of `usable` onto the free lists.
    ///
    /// Frames below the low-memory boundary (including one that straddles
    /// it), inside the IO hole or beyond the frame table stay busy, as do
    /// frames no range mentions. Frames given an explicit count by
    /// [`set_ref`](Self::set_ref) beforehand keep it. Overlapping ranges are
    /// fine.
    ///
    /// # Panics
    /// If called twice.
    pub fn init(&self, usable: &[PfnRange]) {
        assert!(
            !self.initialized.swap(true, Ordering::AcqRel),
            "physical memory manager initialized twice"
        );

        let low_end = PhysicalAddress::new(align_up(self.config.low_memory_end.as_u64(), PAGE_SIZE)).pfn();
        let managed = PfnRange::new(low_end, Pfn::new(self.config.max_frames));
        let mut lists = self.free.lock_irq();
        let mut linked = 0usize;
        for range in usable {
            let range = range.intersect(&managed);
            let (below, above) = match self.config.io_hole {
                Some(hole) => range.split_around(&hole),
                None => (range, PfnRange::default()),
            };
            for pfn in below.iter().chain(above.iter()) {
                let frame = &self.frames[pfn.as_usize()];
                if frame.is_free() {
                    continue;
                }
                if frame.ref_count() != 1 {
                    debug!("pmm: frame {pfn} pinned with {} references", frame.ref_count());
                    continue;
                }
                frame.mark_free();
                lists.push_front(self.frames, self.color_of(pfn), pfn);
                linked += 1;
            }
        }
        drop(lists);

        info!(
            "pmm: {linked} free frames ({} KiB) in {} colors",
            linked * 4,
            self.num_colors
        );
    }

    #[inline]
    #[must_use]
    pub const fn num_colors(&self) -> usize {
        self.num_colors
    }

    #[inline]
    #[must_use]
    pub const fn max_frames(&self) -> usize {
        self.config.max_frames
    }

    #[inline]
    #[must_use]
    pub const fn topology(&self) -> &CacheTopology {
        &self.topology
    }

    /// Color of `pfn` under the allocator's current coloring.
    #[inline]
    #[must_use]
    pub const fn color_of(&self, pfn: Pfn) -> usize {
        pfn.as_usize() & (self.num_colors - 1)
    }

    fn frame(&self, pfn: Pfn) -> &PageFrame {
        assert!(
            pfn.as_usize() < self.config.max_frames,
            "frame {pfn} beyond the frame table ({} frames)",
            self.config.max_frames
        );
        &self.frames[pfn.as_usize()]
    }

    /// Descriptor of `pfn`.
    ///
    /// # Panics
    /// If `pfn` lies beyond the frame table.
    #[must_use]
    pub fn page_frame(&self, pfn: Pfn) -> &PageFrame {
        self.frame(pfn)
    }

    fn take(&self, lists: &mut FreeListSet, color: usize) -> Option<Pfn> {
        let pfn = lists.pop_front(self.frames, color)?;
        self.frames[pfn.as_usize()].mark_allocated(1);
        Some(pfn)
    }

    /// Allocate a frame of any color, rotating through the colors.
    ///
    /// # Errors
    /// [`AllocError::Exhausted`] if no frame is free.
    pub fn alloc_any(&self) -> Result<Pfn, AllocError> {
        let mut lists = self.free.lock_irq();
        let start = self.next_color.load(Ordering::Relaxed);
        for i in 0..self.num_colors {
            let color = (start + i) % self.num_colors;
            if let Some(pfn) = self.take(&mut lists, color) {
                self.next_color.store((color + 1) % self.num_colors, Ordering::Relaxed);
                trace!("alloc {pfn} (color {color})");
                return Ok(pfn);
            }
        }
        Err(AllocError::Exhausted)
    }

    /// Allocate a frame of `color`.
    ///
    /// # Errors
    /// [`AllocError::InvalidColor`] for a color outside the cache,
    /// [`AllocError::Exhausted`] if that color has no free frame.
    pub fn alloc_color(&self, color: usize) -> Result<Pfn, AllocError> {
        self.alloc_color_range(color, 1)
    }

    /// Allocate a frame of the first non-empty color in `[base, base + count)`.
    ///
    /// # Errors
    /// As for [`alloc_color`](Self::alloc_color).
    pub fn alloc_color_range(&self, base: usize, count: usize) -> Result<Pfn, AllocError> {
        let end = base.saturating_add(count);
        if end > self.num_colors {
            return Err(AllocError::InvalidColor {
                color: base.max(self.num_colors),
                colors: self.num_colors,
            });
        }
        let mut lists = self.free.lock_irq();
        (base..end)
            .find_map(|color| self.take(&mut lists, color))
            .ok_or(AllocError::Exhausted)
    }

    /// Allocate a frame of `color` as seen by the cache at `level`.
    ///
    /// A color of a smaller cache spans several last-level colors; the
    /// first one with a free frame wins.
    ///
    /// # Errors
    /// [`AllocError::NoSuchCache`] if the level is not described, else as for
    /// [`alloc_color`](Self::alloc_color).
    pub fn alloc_for_level(&self, level: CacheLevel, color: usize) -> Result<Pfn, AllocError> {
        let cache = self.topology.get(level).ok_or(AllocError::NoSuchCache(level))?;
        let colors = cache.num_colors();
        if color >= colors {
            return Err(AllocError::InvalidColor { color, colors });
        }
        let range = overlapping_colors(colors, self.num_colors, color);
        self.alloc_color_range(range.start, range.len())
    }

    /// Allocate a frame of any color in `colors` (last-level colors).
    ///
    /// Without coloring there is a single list, and any map draws from it.
    ///
    /// # Errors
    /// [`AllocError::Exhausted`] if none of the colors has a free frame.
    pub fn alloc_in_colors(&self, colors: &ColorMap) -> Result<Pfn, AllocError> {
        let mut lists = self.free.lock_irq();
        if self.num_colors == 1 {
            return self.take(&mut lists, 0).ok_or(AllocError::Exhausted);
        }
        colors
            .iter()
            .take_while(|&c| c < self.num_colors)
            .find_map(|color| self.take(&mut lists, color))
            .ok_or(AllocError::Exhausted)
    }

    /// Allocate exactly `pfn`.
    ///
    /// # Errors
    /// [`AllocError::NotFree`] if the frame is in use or reserved.
    ///
    /// # Panics
    /// If `pfn` lies beyond the frame table.
    pub fn alloc_specific(&self, pfn: Pfn) -> Result<Pfn, AllocError> {
        let frame = self.frame(pfn);
        let mut lists = self.free.lock_irq();
        if !frame.is_free() {
            return Err(AllocError::NotFree(pfn));
        }
        lists.remove(self.frames, self.color_of(pfn), pfn);
        frame.mark_allocated(1);
        Ok(pfn)
    }

    /// Allocate `2^order` physically contiguous frames; returns the first.
    ///
    /// Searches from the top of memory down, keeping low memory for callers
    /// that need it. Each frame carries its own reference.
    ///
    /// # Errors
    /// [`AllocError::Exhausted`] if no run of that length is free.
    pub fn alloc_contiguous(&self, order: u32) -> Result<Pfn, AllocError> {
        let count = 1usize.checked_shl(order).ok_or(AllocError::Exhausted)?;
        let mut lists = self.free.lock_irq();

        let mut top = self.config.max_frames;
        while top >= count {
            let window = PfnRange::new(Pfn::new(top - count), Pfn::new(top));
            match window.iter().rev().find(|&p| !self.frames[p.as_usize()].is_free()) {
                Some(busy) => top = busy.as_usize(),
                None => {
                    for pfn in window.iter() {
                        lists.remove(self.frames, self.color_of(pfn), pfn);
                        self.frames[pfn.as_usize()].mark_allocated(1);
                    }
                    trace!("alloc contiguous {window:?}");
                    return Ok(window.start());
                }
            }
        }
        Err(AllocError::Exhausted)
    }

    /// Release a run from [`alloc_contiguous`](Self::alloc_contiguous).
    ///
    /// # Panics
    /// If any frame of the run is still referenced elsewhere.
    pub fn free_contiguous(&self, first: Pfn, order: u32) {
        for i in 0..(1usize << order) {
            let pfn = first + i;
            assert!(self.decref(pfn), "contiguous frame {pfn} still referenced");
        }
    }

    /// Return a frame holding only its allocation reference.
    ///
    /// # Panics
    /// On a double free, or if the frame has other references.
    pub fn free(&self, pfn: Pfn) {
        let frame = self.frame(pfn);
        let mut lists = self.free.lock_irq();
        assert!(!frame.is_free(), "double free of frame {pfn}");
        if let Err(refs) = frame
            .ref_count_atomic()
            .compare_exchange(1, 0, Ordering::AcqRel, Ordering::Acquire)
        {
            panic!("freeing frame {pfn} with {refs} references");
        }
        frame.mark_free();
        lists.push_front(self.frames, self.color_of(pfn), pfn);
    }

    /// Add a reference.
    ///
    /// # Panics
    /// If the frame is free or the count would overflow.
    pub fn incref(&self, pfn: Pfn) {
        let result = self
            .frame(pfn)
            .ref_count_atomic()
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| match r {
                0 | u32::MAX => None,
                r => Some(r + 1),
            });
        if let Err(r) = result {
            panic!("incref of frame {pfn} with {r} references");
        }
    }

    /// Drop a reference. Returns `true` if this freed the frame.
    ///
    /// Frames reserved at boot may be handed to the allocator this way.
    ///
    /// # Panics
    /// If the frame has no references.
    pub fn decref(&self, pfn: Pfn) -> bool {
        let frame = self.frame(pfn);
        let refs = frame.ref_count_atomic();
        loop {
            let current = refs.load(Ordering::Acquire);
            assert!(current != 0, "decref of free frame {pfn}");

            if current == 1 {
                let mut lists = self.free.lock_irq();
                if refs.compare_exchange(1, 0, Ordering::AcqRel, Ordering::Acquire).is_ok() {
                    frame.mark_free();
                    lists.push_front(self.frames, self.color_of(pfn), pfn);
                    return true;
                }
                continue;
            }

            if refs
                .compare_exchange_weak(current, current - 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return false;
            }
        }
    }

    /// Force the reference count of `pfn`, moving it on or off its free list.
    pub fn set_ref(&self, pfn: Pfn, refs: u32) {
        let frame = self.frame(pfn);
        let mut lists = self.free.lock_irq();
        match (frame.is_free(), refs) {
            (true, 0) | (false, 1..) => frame.ref_count_atomic().store(refs, Ordering::Release),
            (true, _) => {
                lists.remove(self.frames, self.color_of(pfn), pfn);
                frame.mark_allocated(refs);
            }
            (false, 0) => {
                frame.mark_free();
                lists.push_front(self.frames, self.color_of(pfn), pfn);
            }
        }
    }

    #[must_use]
    pub fn ref_count(&self, pfn: Pfn) -> u32 {
        self.frame(pfn).ref_count()
    }

    #[must_use]
    pub fn is_free(&self, pfn: Pfn) -> bool {
        self.frame(pfn).is_free()
    }

    /// Set caller flags; the allocator's own bits are ignored.
    pub fn set_flags(&self, pfn: Pfn, flags: PageFlags) {
        self.frame(pfn).insert_flags(flags & PageFlags::USER);
    }

    pub fn clear_flags(&self, pfn: Pfn, flags: PageFlags) {
        self.frame(pfn).remove_flags(flags & PageFlags::USER);
    }

    #[must_use]
    pub fn flags(&self, pfn: Pfn) -> PageFlags {
        self.frame(pfn).flags()
    }

    /// Tag an allocated frame with its user. Cleared when it is freed.
    pub fn set_owner(&self, pfn: Pfn, owner: usize) {
        self.frame(pfn).set_owner(owner);
    }

    #[must_use]
    pub fn owner(&self, pfn: Pfn) -> usize {
        self.frame(pfn).owner()
    }

    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.free.lock_irq().total()
    }

    /// Free frames of `color`, or 0 for a color outside the cache.
    #[must_use]
    pub fn free_frames_in_color(&self, color: usize) -> usize {
        let lists = self.free.lock_irq();
        if color < lists.colors() { lists.len(color) } else { 0 }
    }

    /// Walk every free list and the frame table; returns the free count.
    ///
    /// # Panics
    /// On any broken link, miscolored or referenced free frame, or count
    /// mismatch.
    pub fn check_invariants(&self) -> usize {
        let lists = self.free.lock_irq();
        let mut total = 0;
        for color in 0..self.num_colors {
            let mut prev = None;
            let mut len = 0;
            for pfn in lists.iter(self.frames, color) {
                let frame = &self.frames[pfn.as_usize()];
                assert_eq!(self.color_of(pfn), color, "frame {pfn} on list of color {color}");
                assert!(frame.is_free(), "listed frame {pfn} not marked free");
                assert_eq!(frame.ref_count(), 0, "listed frame {pfn} is referenced");
                assert_eq!(FreeListSet::prev_of(self.frames, pfn), prev, "broken back link at {pfn}");
                assert!(len < self.config.max_frames, "cycle in list of color {color}");
                prev = Some(pfn);
                len += 1;
            }
            assert_eq!(len, lists.len(color), "length of color {color}");
            total += len;
        }

        let marked = self.frames[..self.config.max_frames]
            .iter()
            .filter(|f| f.is_free())
            .count();
        assert_eq!(marked, total, "free frames missing from the lists");
        total
    }
}

impl FrameSource for PhysicalMemoryManager<'_> {
    fn alloc_table_frame(&self) -> Option<Pfn> {
        self.alloc_any().ok()
    }

    fn incref(&self, pfn: Pfn) {
        PhysicalMemoryManager::incref(self, pfn);
    }

    fn decref(&self, pfn: Pfn) {
        PhysicalMemoryManager::decref(self, pfn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDescriptor;

    /// 64 KiB, 4-way, 64 B lines: four colors.
    fn four_colors() -> CacheTopology {
        CacheTopology::none().with(CacheLevel::L2, CacheDescriptor::new(64 * 1024, 4, 64))
    }

    fn table(n: usize) -> Vec<PageFrame> {
        (0..n).map(|_| PageFrame::new()).collect()
    }

    fn all(n: usize) -> [PfnRange; 1] {
        [PfnRange::new(Pfn::new(0), Pfn::new(n))]
    }

    #[test]
    fn colors_partition_the_frames() {
        let frames = table(16);
        let pmm = PhysicalMemoryManager::new(&frames, four_colors(), PmmConfig::unrestricted(16));
        pmm.init(&all(16));
        assert_eq!(pmm.num_colors(), 4);
        for c in 0..4 {
            assert_eq!(pmm.free_frames_in_color(c), 4);
        }
        assert_eq!(pmm.check_invariants(), 16);
    }

    #[test]
    fn color_exhaustion_leaves_other_colors_alone() {
        let frames = table(16);
        let pmm = PhysicalMemoryManager::new(&frames, four_colors(), PmmConfig::unrestricted(16));
        pmm.init(&all(16));

        for _ in 0..4 {
            let pfn = pmm.alloc_color(2).unwrap();
            assert_eq!(pmm.color_of(pfn), 2);
            assert_eq!(pmm.ref_count(pfn), 1);
        }
        assert_eq!(pmm.alloc_color(2), Err(AllocError::Exhausted));
        for c in [0, 1, 3] {
            assert_eq!(pmm.free_frames_in_color(c), 4);
        }
        assert_eq!(
            pmm.alloc_color(4),
            Err(AllocError::InvalidColor { color: 4, colors: 4 })
        );
    }

    #[test]
    fn alloc_any_rotates_colors() {
        let frames = table(16);
        let pmm = PhysicalMemoryManager::new(&frames, four_colors(), PmmConfig::unrestricted(16));
        pmm.init(&all(16));

        let colors: Vec<_> = (0..6).map(|_| pmm.color_of(pmm.alloc_any().unwrap())).collect();
        assert_eq!(colors, [0, 1, 2, 3, 0, 1]);
    }

    #[test]
    fn init_reserves_low_memory_hole_and_table_end() {
        let frames = table(64);
        let config = PmmConfig {
            max_frames: 48,
            low_memory_end: Pfn::new(4).base(),
            io_hole: Some(PfnRange::new(Pfn::new(20), Pfn::new(24))),
            coloring: true,
        };
        let pmm = PhysicalMemoryManager::new(&frames, four_colors(), config);
        pmm.init(&[
            PfnRange::new(Pfn::new(0), Pfn::new(30)),
            PfnRange::new(Pfn::new(28), Pfn::new(64)),
        ]);

        // 4..20 and 24..48
        assert_eq!(pmm.check_invariants(), 16 + 24);
        assert!(!pmm.is_free(Pfn::new(3)));
        assert_eq!(pmm.ref_count(Pfn::new(3)), 1);
        assert!(!pmm.is_free(Pfn::new(21)));
        assert!(pmm.is_free(Pfn::new(29)));
        assert_eq!(frames[50].ref_count(), 1);
    }

    #[test]
    fn frame_straddling_low_memory_end_stays_busy() {
        let frames = table(8);
        let config = PmmConfig {
            low_memory_end: PhysicalAddress::new(0x1800),
            ..PmmConfig::unrestricted(8)
        };
        let pmm = PhysicalMemoryManager::new(&frames, CacheTopology::none(), config);
        pmm.init(&all(8));

        assert!(!pmm.is_free(Pfn::new(1)));
        assert_eq!(pmm.ref_count(Pfn::new(1)), 1);
        assert!(pmm.is_free(Pfn::new(2)));
        assert_eq!(pmm.check_invariants(), 6);
    }

    #[test]
    fn counts_set_before_init_are_kept() {
        let frames = table(8);
        let pmm = PhysicalMemoryManager::new(&frames, CacheTopology::none(), PmmConfig::unrestricted(8));
        pmm.set_ref(Pfn::new(3), 5);
        pmm.init(&all(8));

        assert!(!pmm.is_free(Pfn::new(3)));
        assert_eq!(pmm.ref_count(Pfn::new(3)), 5);
        assert_eq!(pmm.check_invariants(), 7);
    }

    #[test]
    fn failed_free_leaves_the_frame_referenced() {
        let frames = table(4);
        let pmm = PhysicalMemoryManager::new(&frames, CacheTopology::none(), PmmConfig::unrestricted(4));
        pmm.init(&all(4));
        let pfn = pmm.alloc_any().unwrap();
        pmm.incref(pfn);

        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pmm.free(pfn)));
        assert!(res.is_err(), "expected panic");
        assert_eq!(pmm.ref_count(pfn), 2);
        assert!(!pmm.is_free(pfn));
        assert_eq!(pmm.check_invariants(), 3);

        assert!(!pmm.decref(pfn));
        pmm.free(pfn);
        assert_eq!(pmm.check_invariants(), 4);
    }

    #[test]
    fn invalid_color_range_names_first_bad_color() {
        let frames = table(16);
        let pmm = PhysicalMemoryManager::new(&frames, four_colors(), PmmConfig::unrestricted(16));
        pmm.init(&all(16));
        assert_eq!(
            pmm.alloc_color_range(2, 10),
            Err(AllocError::InvalidColor { color: 4, colors: 4 })
        );
        assert_eq!(
            pmm.alloc_color_range(6, 1),
            Err(AllocError::InvalidColor { color: 6, colors: 4 })
        );
    }

    #[test]
    #[should_panic(expected = "initialized twice")]
    fn double_init_panics() {
        let frames = table(4);
        let pmm = PhysicalMemoryManager::new(&frames, CacheTopology::none(), PmmConfig::unrestricted(4));
        pmm.init(&all(4));
        pmm.init(&all(4));
    }

    #[test]
    fn alloc_specific_and_set_ref() {
        let frames = table(8);
        let pmm = PhysicalMemoryManager::new(&frames, four_colors(), PmmConfig::unrestricted(8));
        pmm.init(&all(8));

        assert_eq!(pmm.alloc_specific(Pfn::new(5)), Ok(Pfn::new(5)));
        assert_eq!(pmm.alloc_specific(Pfn::new(5)), Err(AllocError::NotFree(Pfn::new(5))));
        assert_eq!(pmm.free_frames_in_color(1), 1);

        pmm.set_ref(Pfn::new(5), 3);
        assert_eq!(pmm.ref_count(Pfn::new(5)), 3);
        pmm.set_ref(Pfn::new(5), 0);
        assert!(pmm.is_free(Pfn::new(5)));
        pmm.set_ref(Pfn::new(6), 2);
        assert!(!pmm.is_free(Pfn::new(6)));
        assert_eq!(pmm.check_invariants(), 7);
    }

    #[test]
    fn contiguous_runs_come_from_the_top() {
        let frames = table(32);
        let pmm = PhysicalMemoryManager::new(&frames, four_colors(), PmmConfig::unrestricted(32));
        pmm.init(&all(32));
        pmm.alloc_specific(Pfn::new(29)).unwrap();

        // 30..32 too short for four frames; next window ends below 29.
        let first = pmm.alloc_contiguous(2).unwrap();
        assert_eq!(first, Pfn::new(25));
        for p in 25..29 {
            assert_eq!(pmm.ref_count(Pfn::new(p)), 1);
        }
        assert_eq!(pmm.check_invariants(), 32 - 5);

        pmm.free_contiguous(first, 2);
        assert_eq!(pmm.check_invariants(), 32 - 1);
        assert_eq!(pmm.alloc_contiguous(6), Err(AllocError::Exhausted));
    }

    #[test]
    fn flags_and_owner() {
        let frames = table(4);
        let pmm = PhysicalMemoryManager::new(&frames, CacheTopology::none(), PmmConfig::unrestricted(4));
        pmm.init(&all(4));
        let pfn = pmm.alloc_any().unwrap();

        pmm.set_flags(pfn, PageFlags::DIRTY | PageFlags::FREE);
        assert_eq!(pmm.flags(pfn), PageFlags::DIRTY);
        pmm.clear_flags(pfn, PageFlags::DIRTY);
        assert!(pmm.flags(pfn).is_empty());

        pmm.set_owner(pfn, 0xBEEF);
        assert_eq!(pmm.owner(pfn), 0xBEEF);
        pmm.free(pfn);
        assert_eq!(pmm.owner(pfn), 0);
        assert_eq!(pmm.flags(pfn), PageFlags::FREE);
    }

    #[test]
    fn coloring_can_be_switched_off() {
        let frames = table(8);
        let config = PmmConfig::unrestricted(8).with_coloring(false);
        let pmm = PhysicalMemoryManager::new(&frames, four_colors(), config);
        pmm.init(&all(8));
        assert_eq!(pmm.num_colors(), 1);
        assert_eq!(pmm.free_frames_in_color(0), 8);

        let mut map = ColorMap::new();
        map.insert(3);
        assert!(pmm.alloc_in_colors(&map).is_ok());
    }

    #[test]
    #[should_panic(expected = "beyond the frame table")]
    fn frames_past_the_table_panic() {
        let frames = table(8);
        let pmm = PhysicalMemoryManager::new(&frames, CacheTopology::none(), PmmConfig::unrestricted(4));
        let _ = pmm.ref_count(Pfn::new(4));
    }
}
