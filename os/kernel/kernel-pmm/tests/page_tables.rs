use kernel_memory_addresses::{Pfn, PfnRange, PhysicalAddress, VirtualAddress};
use kernel_pmm::*;
use kernel_vmem::{PagePermissions, PageTableWalker, PhysMapper, SparcSrmmu, X86FourLevel};
use std::cell::UnsafeCell;

#[repr(align(4096))]
struct Frame(#[allow(dead_code)] [u8; 4096]);

/// Simulated RAM, one buffer per frame of the manager.
struct Ram(Vec<UnsafeCell<Frame>>);

impl Ram {
    fn new(n: usize) -> Self {
        Self((0..n).map(|_| UnsafeCell::new(Frame([0xA5; 4096]))).collect())
    }
}

impl PhysMapper for Ram {
    unsafe fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        let frame = &self.0[pa.pfn().as_usize()];
        unsafe { frame.get().cast::<u8>().add(pa.page_offset() as usize).cast() }
    }
}

const N: usize = 64;

fn setup(table: &[PageFrame]) -> PhysicalMemoryManager<'_> {
    let l2 = CacheDescriptor::new(64 * 1024, 4, 64);
    let pmm = PhysicalMemoryManager::new(table, CacheTopology::none().with(CacheLevel::L2, l2), PmmConfig::unrestricted(N));
    pmm.init(&[PfnRange::new(Pfn::new(1), Pfn::new(N))]);
    pmm
}

#[test]
fn x86_tree_round_trips_through_the_allocator() {
    let ram = Ram::new(N);
    let table: Vec<PageFrame> = (0..N).map(|_| PageFrame::new()).collect();
    let pmm = setup(&table);
    let before = pmm.free_frames();

    let walker = PageTableWalker::<X86FourLevel, _, _>::new(&ram, &pmm);
    let root = walker.create_root().unwrap();

    let data = pmm.alloc_any().unwrap();
    let va = VirtualAddress::new(0x0000_7FFF_FFFF_F000);
    walker
        .walk(root, va, true)
        .unwrap()
        .install_leaf(data.base(), PagePermissions::USER_DATA);
    assert_eq!(walker.translate(root, va + 0x10), Some(data.base() + 0x10));
    assert_eq!(pmm.free_frames(), before - 5);

    walker.destroy(root, None);
    // The data frame belongs to its mapper, not to the tree.
    assert_eq!(pmm.ref_count(data), 1);
    assert!(pmm.decref(data));
    assert_eq!(pmm.check_invariants(), before);
}

#[test]
fn kernel_half_survives_user_teardown() {
    let ram = Ram::new(N);
    let table: Vec<PageFrame> = (0..N).map(|_| PageFrame::new()).collect();
    let pmm = setup(&table);
    let before = pmm.free_frames();

    let walker = PageTableWalker::<X86FourLevel, _, _>::new(&ram, &pmm);
    let root = walker.create_root().unwrap();
    let kernel_base = VirtualAddress::new(0xFFFF_8000_0000_0000);
    walker.walk(root, VirtualAddress::new(0x40_0000), true).unwrap();
    walker.walk(root, kernel_base, true).unwrap();
    assert_eq!(pmm.free_frames(), before - 7);

    walker.destroy(root, Some(kernel_base));
    // Root plus the three user tables came back; the kernel's three did not.
    assert_eq!(pmm.free_frames(), before - 3);
    assert_eq!(pmm.check_invariants(), before - 3);
}

#[test]
fn packed_sparc_tables_share_frames() {
    let ram = Ram::new(N);
    let table: Vec<PageFrame> = (0..N).map(|_| PageFrame::new()).collect();
    let pmm = setup(&table);
    let before = pmm.free_frames();

    let walker = PageTableWalker::<SparcSrmmu, _, _>::new(&ram, &pmm);
    let root = walker.create_root().unwrap();
    let va = VirtualAddress::new(0x1000_0000);
    walker
        .walk(root, va, true)
        .unwrap()
        .install_leaf(PhysicalAddress::new(0x3_0000), PagePermissions::KERNEL_DATA);

    // Root, one frame of level-1 tables, one frame of level-2 tables.
    assert_eq!(pmm.free_frames(), before - 3);
    assert_eq!(walker.translate(root, va), Some(PhysicalAddress::new(0x3_0000)));
    // A neighbouring region reuses the packed level-1 frame.
    walker.walk(root, VirtualAddress::new(0x1100_0000), true).unwrap();
    assert_eq!(pmm.free_frames(), before - 4);

    walker.destroy(root, None);
    assert_eq!(pmm.check_invariants(), before);
}

#[test]
fn table_allocation_failure_is_reported() {
    let ram = Ram::new(4);
    let table: Vec<PageFrame> = (0..4).map(|_| PageFrame::new()).collect();
    let pmm = PhysicalMemoryManager::new(&table, CacheTopology::none(), PmmConfig::unrestricted(4));
    pmm.init(&[PfnRange::new(Pfn::new(0), Pfn::new(3))]);

    let walker = PageTableWalker::<X86FourLevel, _, _>::new(&ram, &pmm);
    let root = walker.create_root().unwrap();
    assert_eq!(
        walker.walk(root, VirtualAddress::new(0x1000), true).err(),
        Some(kernel_vmem::WalkError::OutOfMemory)
    );
}
