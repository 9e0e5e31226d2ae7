//! # Kernel Memory Layout
//!
//! Compile-time constants describing the physical and virtual memory layout.
//! The physical memory manager uses them as *defaults* for its run-time
//! configuration; nothing here is hard-wired into the allocator itself.
//!
//! ```text
//! Physical Memory Layout:
//! 0x0000_0000   ┌─────────────────────────────────┐
//!               │     Low Memory (< 640 KiB)      │
//! IOPHYSMEM     ├─────────────────────────────────┤ 0x000A_0000
//!               │   VGA / BIOS ROM window         │
//! EXTPHYSMEM    ├─────────────────────────────────┤ 0x0010_0000 (1 MiB)
//!               │   Kernel image, boot data,      │
//!               │   available RAM                 │
//! IO_HOLE_START ├─────────────────────────────────┤ 0xC000_0000
//!               │   PCI / IO hole                 │
//! IO_HOLE_END   ├─────────────────────────────────┤ 0x1_0000_0000
//!               │   Available RAM above 4 GiB     │
//!               └─────────────────────────────────┘
//! ```
//!
//! ```text
//! Virtual Address Space Layout (64-bit):
//!
//! 0x0000_0000_0000_0000 ┌─────────────────────────────────┐
//!                       │         User Space              │
//! USERSPACE_END         ├─────────────────────────────────┤ 0xffff_0000_0000_0000
//!                       │        Guard Region             │
//! HHDM_BASE             ├─────────────────────────────────┤ 0xffff_8880_0000_0000
//!                       │   Higher Half Direct Mapping    │
//! KERNEL_BASE           ├─────────────────────────────────┤ 0xffff_ffff_8000_0000
//!                       │       Kernel Text & Data        │
//! 0xFFFF_FFFF_FFFF_FFFF └─────────────────────────────────┘
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
