use kernel_memory_addresses::{Pfn, PfnRange};
use kernel_pmm::*;
use std::collections::HashSet;
use std::sync::{Barrier, Mutex};
use std::thread;

fn topology() -> CacheTopology {
    CacheTopology::none().with(CacheLevel::L2, CacheDescriptor::new(256 * 1024, 16, 64))
}

#[test]
fn concurrent_allocations_are_disjoint() {
    let threads = 8;
    let per_thread = 64;
    let n = threads * per_thread;

    let table: Vec<PageFrame> = (0..n).map(|_| PageFrame::new()).collect();
    let pmm = PhysicalMemoryManager::new(&table, topology(), PmmConfig::unrestricted(n));
    pmm.init(&[PfnRange::new(Pfn::new(0), Pfn::new(n))]);

    let seen = Mutex::new(HashSet::new());
    let start = Barrier::new(threads);
    thread::scope(|s| {
        for t in 0..threads {
            let (pmm, seen, start) = (&pmm, &seen, &start);
            s.spawn(move || {
                start.wait();
                let mut mine = Vec::with_capacity(per_thread);
                for i in 0..per_thread {
                    let pfn = if i % 2 == 0 {
                        pmm.alloc_any().unwrap()
                    } else {
                        pmm.alloc_for_level(CacheLevel::L2, t % 4).or_else(|_| pmm.alloc_any()).unwrap()
                    };
                    mine.push(pfn);
                }
                let mut seen = seen.lock().unwrap();
                for pfn in mine {
                    assert!(seen.insert(pfn), "frame {pfn} handed out twice");
                }
            });
        }
    });

    assert_eq!(seen.lock().unwrap().len(), n);
    assert_eq!(pmm.alloc_any(), Err(AllocError::Exhausted));
    assert_eq!(pmm.check_invariants(), 0);
}

#[test]
fn concurrent_reference_traffic_keeps_lists_consistent() {
    let threads = 6;
    let n = 256;
    let table: Vec<PageFrame> = (0..n).map(|_| PageFrame::new()).collect();
    let pmm = PhysicalMemoryManager::new(&table, topology(), PmmConfig::unrestricted(n));
    pmm.init(&[PfnRange::new(Pfn::new(0), Pfn::new(n))]);

    // A handful of shared frames everybody increfs and decrefs.
    let shared: Vec<Pfn> = (0..8).map(|_| pmm.alloc_any().unwrap()).collect();
    let start = Barrier::new(threads);

    thread::scope(|s| {
        for _ in 0..threads {
            let (pmm, shared, start) = (&pmm, &shared, &start);
            s.spawn(move || {
                start.wait();
                for round in 0..2_000 {
                    let pfn = shared[round % shared.len()];
                    pmm.incref(pfn);
                    let private = pmm.alloc_any().unwrap();
                    pmm.incref(private);
                    assert!(!pmm.decref(private));
                    assert!(!pmm.decref(pfn));
                    assert!(pmm.decref(private));
                }
            });
        }
    });

    for &pfn in &shared {
        assert_eq!(pmm.ref_count(pfn), 1);
        assert!(pmm.decref(pfn));
    }
    assert_eq!(pmm.check_invariants(), n);
}
