//! # Physical and Virtual Memory Address Types
//!
//! Strongly typed wrappers for the raw numbers the physical memory manager
//! passes around: physical addresses, virtual addresses and **physical frame
//! numbers** (PFNs).
//!
//! ## Overview
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] | A byte address in physical memory (RAM or MMIO). |
//! | [`VirtualAddress`] | A byte address translated by the page tables. |
//! | [`Pfn`] | A page-granularity index into physical memory (`pa >> PAGE_SHIFT`). |
//! | [`PfnRange`] | A half-open range `[start, end)` of frame numbers. |
//!
//! The frame number is the currency of the allocator: the frame table is
//! indexed by it, free lists are linked by it and cache colors are derived from
//! its low bits. Addresses only appear at the boundary to page tables and boot
//! memory maps.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x0000_0000_0030_0042);
//! let pfn = pa.pfn();
//! assert_eq!(pfn.as_usize(), 0x300);
//! assert_eq!(pfn.base().as_u64() + pa.page_offset(), pa.as_u64());
//!
//! // A partially covered frame at either edge is not part of the range.
//! let range = PfnRange::from_phys(PhysicalAddress::new(0x1800), PhysicalAddress::new(0x5000));
//! assert_eq!(range.start().as_usize(), 2);
//! assert_eq!(range.end().as_usize(), 5);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod frame_range;
mod page_frame_number;
mod physical_address;
mod virtual_address;

pub use crate::frame_range::PfnRange;
pub use crate::page_frame_number::Pfn;
pub use crate::physical_address::PhysicalAddress;
pub use crate::virtual_address::VirtualAddress;

/// log2 of the base page size.
pub const PAGE_SHIFT: u32 = 12;

/// Size of a base page (and of a physical frame) in bytes.
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

/// Align `x` down to the nearest multiple of `a`.
///
/// ### Preconditions
/// - `a` must be **non-zero** and a **power of two**.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::align_down;
/// assert_eq!(align_down(0,      4096), 0);
/// assert_eq!(align_down(4095,   4096), 0);
/// assert_eq!(align_down(8191,   4096), 4096);
/// assert_eq!(align_down(0x12345,   16), 0x12340);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_down(x: u64, a: u64) -> u64 {
    x & !(a - 1)
}

/// Align `x` up to the nearest multiple of `a`.
///
/// ### Preconditions
/// - `a` must be **non-zero** and a **power of two**.
/// - `x + (a - 1)` must not overflow `u64`.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::align_up;
/// assert_eq!(align_up(0,       4096), 0);
/// assert_eq!(align_up(1,       4096), 4096);
/// assert_eq!(align_up(4097,    4096), 8192);
/// assert_eq!(align_up(0x12345,   16), 0x12350);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_up(x: u64, a: u64) -> u64 {
    (x + a - 1) & !(a - 1)
}
