#![cfg_attr(not(any(test, feature = "software-emulation")), no_std)]

//! # Aster Physical Memory Manager (PMM)
//!
//! Brings up physical page allocation from the boot summary produced by the `fdt` crate:
//!
//! - Region arithmetic: overlap of two regions and the largest gap left in RAM once
//!   reservations are subtracted.
//! - A page allocator whose per-page state lives at the start of the memory it manages.
//! - Software emulation of physical memory for testing in non-kernel environments.

#[cfg(any(test, feature = "software-emulation"))]
extern crate alloc;

mod address;
mod bitmap;
mod human;
mod physical_memory_manager;
mod region;
mod translator;

pub use address::{PhysicalAddress, align_down, align_up};
pub use bitmap::{PageBitmap, PageEntry, PageFlag, PageState};
pub use human::{HumanAddress, HumanSize};
pub use physical_memory_manager::{AllocError, InitError, PhysicalMemoryManager};
pub use region::{available_memory, find_largest_gap, overlap};
#[cfg(any(test, feature = "software-emulation"))]
pub use translator::EmulatedMemory;
pub use translator::AddressTranslator;

pub use fdt::MemRegion;

/// Allocation granularity in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Alignment of the page metadata arena.
pub const METADATA_ALIGN: usize = 64;
