//! The boot summary produced by the parser.
//!
//! Everything here is fixed-capacity so that it can live on the boot stack before any
//! allocator exists.

use core::fmt;

/// Maximum number of RAM regions kept from `memory` nodes.
pub const MAX_MEMORY_REGIONS: usize = 8;

/// Maximum number of reserved regions kept from the reservation table and
/// `reserved-memory` nodes combined.
pub const MAX_RESERVED_REGIONS: usize = 8;

/// Maximum number of syscon-class devices kept.
pub const MAX_SYSCON_DEVICES: usize = 4;

/// Size of a syscon device name buffer, including room for a terminator.
pub const SYSCON_NAME_LEN: usize = 32;

/// A contiguous range of physical memory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemRegion {
    /// Base physical address.
    pub base: usize,
    /// Size in bytes.
    pub size: usize,
}

impl MemRegion {
    /// Creates a new memory region.
    pub const fn new(base: usize, size: usize) -> Self {
        Self { base, size }
    }

    /// Returns a region of size zero.
    pub const fn empty() -> Self {
        Self { base: 0, size: 0 }
    }

    /// Returns the end address (exclusive) of this region, saturating at `usize::MAX`.
    pub const fn end(&self) -> usize {
        self.base.saturating_add(self.size)
    }

    /// Returns true if the region covers no bytes.
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns true if `address` lies within this region.
    pub const fn contains(&self, address: usize) -> bool {
        address >= self.base && address < self.end()
    }
}

impl fmt::Display for MemRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.base, self.end())
    }
}

/// A platform control device (reset/shutdown capable) found by its `compatible` strings.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SysconDevice {
    /// Base address of the device's register window.
    pub base: usize,
    /// Size of the register window in bytes.
    pub size: usize,
    name: [u8; SYSCON_NAME_LEN],
    name_len: usize,
}

impl SysconDevice {
    /// Creates a device record, truncating `name` to `SYSCON_NAME_LEN - 1` bytes.
    pub fn new(name: &[u8], base: usize, size: usize) -> Self {
        let name_len = name.len().min(SYSCON_NAME_LEN - 1);
        let mut buffer = [0; SYSCON_NAME_LEN];
        buffer[..name_len].copy_from_slice(&name[..name_len]);
        Self {
            base,
            size,
            name: buffer,
            name_len,
        }
    }

    /// Returns the node name as raw bytes.
    pub fn name_bytes(&self) -> &[u8] {
        &self.name[..self.name_len]
    }

    /// Returns the node name.
    ///
    /// Truncation can split a multi-byte character; only the valid UTF-8 prefix is returned.
    pub fn name(&self) -> &str {
        let bytes = self.name_bytes();
        match core::str::from_utf8(bytes) {
            Ok(name) => name,
            Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
        }
    }
}

impl Default for SysconDevice {
    fn default() -> Self {
        Self {
            base: 0,
            size: 0,
            name: [0; SYSCON_NAME_LEN],
            name_len: 0,
        }
    }
}

impl fmt::Debug for SysconDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysconDevice")
            .field("name", &self.name())
            .field("base", &format_args!("{:#x}", self.base))
            .field("size", &format_args!("{:#x}", self.size))
            .finish()
    }
}

/// Fixed-capacity, insertion-ordered list.
///
/// Pushing onto a full list drops the item; discoveries past capacity are not an error.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedList<T: Copy + Default, const N: usize> {
    items: [T; N],
    count: usize,
}

impl<T: Copy + Default, const N: usize> FixedList<T, N> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            items: [T::default(); N],
            count: 0,
        }
    }

    /// Returns the number of items in the list.
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the list is empty.
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the list is full.
    pub const fn is_full(&self) -> bool {
        self.count >= N
    }

    /// Appends an item, returning `false` if the list was full and the item was dropped.
    pub fn push(&mut self, item: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.items[self.count] = item;
        self.count += 1;
        true
    }

    /// Returns the items as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items[..self.count]
    }

    /// Returns an iterator over the items.
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.as_slice().iter()
    }
}

impl<T: Copy + Default, const N: usize> Default for FixedList<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default + fmt::Debug, const N: usize> fmt::Debug for FixedList<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T: Copy + Default, const N: usize> IntoIterator for &'a FixedList<T, N> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Hardware summary extracted from the firmware's device tree.
///
/// Created on the boot stack, filled once by [`crate::parse`], then handed to the
/// physical memory manager.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootInfo {
    /// Number of `cpu@…` nodes under `/cpus`. Not capped.
    pub core_count: usize,
    /// Id of the hart the firmware booted on, from the blob header.
    pub boot_hart_id: u32,
    /// RAM regions in discovery order.
    pub memory_regions: FixedList<MemRegion, MAX_MEMORY_REGIONS>,
    /// Reservation table entries followed by `reserved-memory` child regions.
    pub reserved_regions: FixedList<MemRegion, MAX_RESERVED_REGIONS>,
    /// Syscon-class devices in discovery order.
    pub syscon_devices: FixedList<SysconDevice, MAX_SYSCON_DEVICES>,
    /// Address of the source blob.
    pub dtb_base: usize,
    /// Total size of the source blob, from its header.
    pub dtb_size: usize,
}

impl BootInfo {
    /// Returns an empty summary with every count at zero.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses the device tree blob at `ptr`.
    ///
    /// Reads the header to learn the blob's total size, then parses that many bytes.
    /// An invalid magic number yields an empty summary.
    ///
    /// # Safety
    ///
    /// `ptr` must point to readable memory of at least the header size, and, if the magic
    /// number is valid, of at least the header's `totalsize` bytes. The memory must not be
    /// written while this function runs.
    pub unsafe fn from_ptr(ptr: *const u8) -> Self {
        if ptr.is_null() {
            return Self::empty();
        }

        // SAFETY: The caller guarantees the header is readable.
        let header = unsafe { core::slice::from_raw_parts(ptr, crate::header::HEADER_SIZE) };
        let total_size = match crate::header::FdtHeader::parse(header) {
            Ok(header) => header.total_size as usize,
            Err(e) => {
                log::warn!("device tree at {:p} rejected: {}", ptr, e);
                return Self::empty();
            }
        };

        // SAFETY: The magic number is valid, so the caller guarantees `totalsize` bytes.
        let blob = unsafe {
            core::slice::from_raw_parts(ptr, total_size.max(crate::header::HEADER_SIZE))
        };
        crate::parse(blob)
    }

    /// Returns the RAM regions.
    pub fn memory_regions(&self) -> &[MemRegion] {
        self.memory_regions.as_slice()
    }

    /// Returns the reserved regions.
    pub fn reserved_regions(&self) -> &[MemRegion] {
        self.reserved_regions.as_slice()
    }

    /// Returns the syscon devices.
    pub fn syscon_devices(&self) -> &[SysconDevice] {
        self.syscon_devices.as_slice()
    }

    /// Returns the region occupied by the source blob.
    pub const fn dtb_region(&self) -> MemRegion {
        MemRegion::new(self.dtb_base, self.dtb_size)
    }
}
