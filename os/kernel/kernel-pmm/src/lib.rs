//! # Kernel Physical Memory Manager
//!
//! Owns every physical frame of the machine: which frames are free, who holds
//! references to the rest, and which cache color each frame has.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │             Page-Table Walker (kernel-vmem)         │
//! │    • Finds / creates translation entries            │
//! │    • Tears down address spaces                      │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ FrameSource (alloc / incref / decref)
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Physical Memory Manager                   │
//! │    • One descriptor per 4 KiB frame                 │
//! │    • One free list per cache color                  │
//! │    • Reference counts, contiguous runs              │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │        Cache Topology & Color Reservations          │
//! │    • L1/L2/L3 geometry → page colors                │
//! │    • Exclusive colors per client                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Cache topology ([`cache`])
//!
//! Derives page colors from cache geometry. The last-level cache decides how
//! many free lists the allocator keeps; without the `page-coloring` feature
//! there is exactly one.
//!
//! ### Frame descriptors ([`PageFrame`])
//!
//! A reference count, flags, an owner tag and the free-list links. A frame
//! is free iff its count is zero, and then it sits on exactly one list: the
//! one of its color.
//!
//! ### The manager ([`PhysicalMemoryManager`])
//!
//! Allocation by any color (round robin), a given color, a color of a
//! smaller cache, a client's [`ColorMap`], a specific frame, or a contiguous
//! run. Frames come back when their last reference is dropped.
//!
//! ### Boot classification ([`boot`])
//!
//! Turns a firmware memory map (or its absence) into usable frame ranges.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_memory_addresses::{Pfn, PfnRange};
//! use kernel_pmm::*;
//!
//! let frames: Vec<PageFrame> = (0..64).map(|_| PageFrame::new()).collect();
//! let l2 = CacheDescriptor::new(64 * 1024, 4, 64);
//! let topology = CacheTopology::none().with(CacheLevel::L2, l2);
//!
//! let pmm = PhysicalMemoryManager::new(&frames, topology, PmmConfig::unrestricted(64));
//! pmm.init(&[PfnRange::new(Pfn::new(8), Pfn::new(64))]);
//!
//! let pfn = pmm.alloc_color(1)?;
//! assert_eq!(pmm.color_of(pfn), 1);
//! pmm.incref(pfn);
//! assert!(!pmm.decref(pfn));
//! assert!(pmm.decref(pfn));
//! assert_eq!(pmm.free_frames(), 56);
//! # Ok::<(), AllocError>(())
//! ```
//!
//! ## Concurrency
//!
//! Free lists sit behind one [`SpinMutex`](kernel_sync::SpinMutex) taken with
//! interrupts disabled. Reference counts are atomic; only the final decrement
//! takes the lock, so a frame can never be observed at zero while off its
//! list.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod boot;
pub mod cache;
mod colors;
mod config;
mod error;
mod frame;
mod free_list;
mod manager;
pub mod phys_mapper;

pub use crate::cache::{CacheDescriptor, CacheLevel, CacheTopology, MAX_COLORS, overlapping_colors};
pub use crate::colors::{ColorMap, ColorReservations};
pub use crate::config::{PmmConfig, legacy_io_hole};
pub use crate::error::{AllocError, ColorError};
pub use crate::frame::{PageFlags, PageFrame};
pub use crate::manager::PhysicalMemoryManager;
