//! # Memory Layout

/// Start of the legacy VGA/BIOS IO window below 1 MiB.
pub const IOPHYSMEM: u64 = 0x000A_0000;

/// Start of extended memory (1 MiB). Nothing below this boundary is handed
/// to the frame allocator by default.
pub const EXTPHYSMEM: u64 = 0x0010_0000;

/// Start of the 32-bit PCI/IO hole that is reserved when the boot loader
/// reports no memory map.
pub const IO_HOLE_START: u64 = 0xC000_0000;

/// End (exclusive) of the 32-bit PCI/IO hole.
pub const IO_HOLE_END: u64 = 0x1_0000_0000;

/// End of userspace VA range after which Kernel space begins.
pub const USERSPACE_END: u64 = 0xffff_0000_0000_0000;

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything you map at [`HHDM_BASE`] + `pa` lets the kernel
/// access physical memory via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Where the kernel executes (VMA).
///
/// Root page-table entries at and above this address are shared by every
/// address space and are never torn down with a process.
pub const KERNEL_BASE: u64 = 0xffff_ffff_8000_0000;

const _: () = {
    assert!(IOPHYSMEM < EXTPHYSMEM);
    assert!(EXTPHYSMEM.is_multiple_of(4096));
    assert!(IO_HOLE_START.is_multiple_of(4096) && IO_HOLE_END.is_multiple_of(4096));
    assert!(IO_HOLE_START < IO_HOLE_END);
    assert!(HHDM_BASE >= USERSPACE_END);
    assert!(KERNEL_BASE > HHDM_BASE);
};
