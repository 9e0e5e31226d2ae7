//! In-memory "physical RAM" and a reference-counting frame source for tests.

use crate::{FrameSource, PhysMapper};
use core::cell::{Cell, RefCell, UnsafeCell};
use core::ops::Range;
use kernel_memory_addresses::{Pfn, PhysicalAddress};

/// A 4 KiB-aligned raw frame.
#[repr(align(4096))]
struct Aligned4K(#[allow(dead_code)] [u8; 4096]);

/// Physical memory simulated as a vector of 4 KiB-aligned frames.
///
/// Physical addresses are byte offsets from 0; frame `n` backs `[n * 4096, (n + 1) * 4096)`.
pub struct TestPhys {
    frames: Vec<UnsafeCell<Aligned4K>>,
}

impl TestPhys {
    pub fn with_frames(n: usize) -> Self {
        let frames = (0..n).map(|_| UnsafeCell::new(Aligned4K([0u8; 4096]))).collect();
        Self { frames }
    }
}

impl PhysMapper for TestPhys {
    unsafe fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        let frame = &self.frames[pa.pfn().as_usize()];
        unsafe { frame.get().cast::<u8>().add(pa.page_offset() as usize).cast() }
    }
}

/// Hands out frames from a range in ascending order and tracks references.
pub struct CountingFrames {
    next: Cell<usize>,
    end: usize,
    refs: RefCell<Vec<u32>>,
    released: RefCell<Vec<Pfn>>,
}

impl CountingFrames {
    pub fn new(range: Range<usize>) -> Self {
        Self {
            next: Cell::new(range.start),
            end: range.end,
            refs: RefCell::new(vec![0; range.end]),
            released: RefCell::new(Vec::new()),
        }
    }

    /// Number of frames handed out so far.
    pub fn allocated(&self) -> usize {
        self.refs.borrow().iter().filter(|&&r| r > 0).count() + self.released.borrow().len()
    }

    pub fn ref_count(&self, pfn: Pfn) -> u32 {
        self.refs.borrow()[pfn.as_usize()]
    }

    /// Frames whose count dropped to zero, in release order.
    pub fn released(&self) -> Vec<Pfn> {
        self.released.borrow().clone()
    }
}

impl FrameSource for CountingFrames {
    fn alloc_table_frame(&self) -> Option<Pfn> {
        let n = self.next.get();
        if n >= self.end {
            return None;
        }
        self.next.set(n + 1);
        self.refs.borrow_mut()[n] = 1;
        Some(Pfn::new(n))
    }

    fn incref(&self, pfn: Pfn) {
        let mut refs = self.refs.borrow_mut();
        assert!(refs[pfn.as_usize()] > 0, "incref of free frame {pfn}");
        refs[pfn.as_usize()] += 1;
    }

    fn decref(&self, pfn: Pfn) {
        let mut refs = self.refs.borrow_mut();
        let r = &mut refs[pfn.as_usize()];
        assert!(*r > 0, "decref of free frame {pfn}");
        *r -= 1;
        if *r == 0 {
            self.released.borrow_mut().push(pfn);
        }
    }
}
