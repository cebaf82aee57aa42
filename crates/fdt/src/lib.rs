//! Flattened device tree reader.
//!
//! Turns the blob handed over by firmware into a [`BootInfo`]: core count, RAM regions,
//! reserved regions and syscon-class devices. Parsing never allocates and never fails
//! outright; malformed input produces a partial (or empty) summary and a log message.

#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "builder"))]
extern crate alloc;

mod boot_info;
#[cfg(any(test, feature = "builder"))]
mod builder;
mod endian;
mod header;
mod parser;
mod property;

pub use boot_info::{
    BootInfo, FixedList, MAX_MEMORY_REGIONS, MAX_RESERVED_REGIONS, MAX_SYSCON_DEVICES,
    MemRegion, SYSCON_NAME_LEN, SysconDevice,
};
#[cfg(any(test, feature = "builder"))]
pub use builder::FdtBuilder;
pub use header::{FDT_MAGIC, FdtHeader, HEADER_SIZE, HeaderError};
pub use parser::{MAX_NODE_DEPTH, Token, parse};
pub use property::{RegCells, RegIter, is_syscon_compatible, string_list};
