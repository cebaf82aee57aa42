//! Bitmap page allocator bootstrapped inside the memory it manages.
//!
//! Initialization picks the largest unreserved gap in RAM, carves the page arena out of
//! its start and hands the page-aligned remainder out in whole pages:
//!
//! ```text
//!  gap.base                                                         gap.end
//!  |<- align ->|<- metadata ->|<- pad ->|<---------- usable ------------>|
//!              ^ 64-byte aligned        ^ page aligned
//! ```
//!
//! The arena holds one four-bit entry per usable page (see [`PageBitmap`]). Allocations
//! are first-fit runs of pages; every page of a run except the last carries a
//! "continues" bit so that `free` can release the whole run from its first address.

use core::fmt;

use fdt::{BootInfo, MemRegion};

use crate::bitmap::{PageBitmap, PageEntry, PageFlag, PageState};
use crate::region::{available_memory, largest_gap};
use crate::{AddressTranslator, HumanAddress, HumanSize, METADATA_ALIGN, PAGE_SIZE};
use crate::{PhysicalAddress, address::align_up};

/// Reasons initialization can fail. All of them are fatal for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// No RAM is left once reservations are subtracted.
    NoUsableMemory,
    /// The chosen gap is too small to hold the arena and at least one page.
    RegionTooSmall,
    /// The arena's physical range could not be reached through the translator.
    MetadataUnmapped,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::NoUsableMemory => write!(f, "no usable memory found"),
            InitError::RegionTooSmall => write!(f, "largest free region is too small"),
            InitError::MetadataUnmapped => write!(f, "page metadata is not addressable"),
        }
    }
}

/// Reasons an allocation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// A zero-byte allocation was requested.
    ZeroSize,
    /// No run of free pages is long enough.
    OutOfMemory,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::ZeroSize => write!(f, "zero-size allocation"),
            AllocError::OutOfMemory => write!(f, "out of physical memory"),
        }
    }
}

const RUN_PAGE: PageEntry = PageEntry::with(&[PageFlag::Allocated, PageFlag::Continues]);
const LAST_PAGE: PageEntry = PageEntry::with(&[PageFlag::Allocated]);
const PINNED_PAGE: PageEntry = PageEntry::with(&[PageFlag::Allocated, PageFlag::Pinned]);

/// The physical page allocator.
///
/// There is exactly one per kernel. It borrows its page arena for `'a` from the
/// [`AddressTranslator`] it was initialized with.
pub struct PhysicalMemoryManager<'a> {
    metadata: MemRegion,
    usable: MemRegion,
    bitmap: PageBitmap<'a>,
    free_pages: usize,
}

impl<'a> PhysicalMemoryManager<'a> {
    /// Builds the allocator from the boot summary.
    ///
    /// Selects the largest gap between `info`'s memory and reserved regions, places the
    /// zeroed arena at its 64-byte aligned start and makes everything after the arena,
    /// from the next page boundary on, available for allocation.
    pub fn init(info: &BootInfo, translator: &'a AddressTranslator) -> Result<Self, InitError> {
        Self::init_excluding(info, &[], translator)
    }

    /// Like [`init`](Self::init), but the gap must also stay clear of `excluded`.
    ///
    /// For memory the firmware does not list, such as the running kernel image. Unlike
    /// `info`'s reserved list, `excluded` is not capacity-bounded, and the arena is never
    /// placed over it.
    pub fn init_excluding(
        info: &BootInfo,
        excluded: &[MemRegion],
        translator: &'a AddressTranslator,
    ) -> Result<Self, InitError> {
        let available = info.memory_regions();
        let reserved = info.reserved_regions();

        log::info!(
            "{} of RAM in {} regions, {} after {} reservations",
            HumanSize(available.iter().map(|region| region.size).sum()),
            available.len(),
            HumanSize(available_memory(available, reserved)),
            reserved.len(),
        );

        for region in excluded {
            log::debug!(
                "excluding {}..{} ({})",
                HumanAddress(region.base),
                HumanAddress(region.end()),
                HumanSize(region.size)
            );
        }

        let region = largest_gap(available, reserved.iter().chain(excluded));
        if region.is_empty() {
            log::error!("no free gap in physical memory");
            return Err(InitError::NoUsableMemory);
        }
        log::debug!(
            "largest free region {}..{} ({})",
            HumanAddress(region.base),
            HumanAddress(region.end()),
            HumanSize(region.size)
        );

        let (metadata, usable) = Self::partition(region)?;
        let page_count = (usable.size / PAGE_SIZE).min(2 * metadata.size);
        if page_count == 0 {
            return Err(InitError::RegionTooSmall);
        }

        // SAFETY: The arena lies inside a gap no reservation covers, and this manager is
        // its only user from now on.
        let arena = unsafe { translator.bytes_mut(metadata) }.ok_or(InitError::MetadataUnmapped)?;
        let mut bitmap = PageBitmap::new(arena, page_count);
        bitmap.clear();

        log::debug!(
            "page metadata at {} ({}), {} pages from {}",
            HumanAddress(metadata.base),
            HumanSize(metadata.size),
            page_count,
            HumanAddress(usable.base)
        );
        log::info!(
            "physical memory manager ready: {} MiB usable",
            HumanSize(usable.size).mebibytes()
        );

        Ok(Self {
            metadata,
            usable,
            bitmap,
            free_pages: page_count,
        })
    }

    /// Splits `region` into the arena and the page-aligned usable range after it.
    fn partition(region: MemRegion) -> Result<(MemRegion, MemRegion), InitError> {
        let metadata_base = align_up(region.base, METADATA_ALIGN).ok_or(InitError::RegionTooSmall)?;
        let metadata = MemRegion::new(metadata_base, region.size / (2 * PAGE_SIZE));
        if metadata.is_empty() {
            return Err(InitError::RegionTooSmall);
        }

        let usable_base = align_up(metadata.end(), PAGE_SIZE).ok_or(InitError::RegionTooSmall)?;
        if usable_base >= region.end() {
            return Err(InitError::RegionTooSmall);
        }
        let usable = MemRegion::new(usable_base, region.end() - usable_base);

        Ok((metadata, usable))
    }

    /// Allocates enough contiguous pages for `size` bytes.
    ///
    /// Returns the page-aligned address of the first page. The run is found first-fit
    /// from the start of usable memory.
    pub fn allocate(&mut self, size: usize) -> Result<PhysicalAddress, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        let pages = size.div_ceil(PAGE_SIZE);
        let Some(first) = self.bitmap.find_free_run(pages) else {
            log::debug!("no run of {} free pages for {}", pages, HumanSize(size));
            return Err(AllocError::OutOfMemory);
        };

        let last = first + pages - 1;
        for index in first..last {
            self.bitmap.set(index, RUN_PAGE);
        }
        self.bitmap.set(last, LAST_PAGE);
        self.free_pages -= pages;

        Ok(self.page_address(first))
    }

    /// Releases the allocation starting at `address`.
    ///
    /// Addresses outside the tracked pages, unaligned addresses, addresses in the middle
    /// of an allocation, reserved pages and pages that are already free are all ignored.
    pub fn free(&mut self, address: PhysicalAddress) {
        let Some(first) = self.page_index(address) else {
            log::warn!("ignoring free of untracked address {}", address);
            return;
        };
        if !address.is_aligned(PAGE_SIZE) {
            log::warn!("ignoring free of unaligned address {}", address);
            return;
        }

        let Some(entry) = self.bitmap.get(first) else {
            return;
        };
        if entry.state() == PageState::Free {
            return;
        }
        if entry.test(PageFlag::Pinned) {
            log::warn!("ignoring free of reserved page {}", address);
            return;
        }
        let interior = first
            .checked_sub(1)
            .and_then(|previous| self.bitmap.get(previous))
            .is_some_and(|previous| previous.test(PageFlag::Continues));
        if interior {
            log::warn!("ignoring free of {}, which is inside an allocation", address);
            return;
        }

        let mut index = first;
        while let Some(entry) = self.bitmap.get(index) {
            self.bitmap.set(index, PageEntry::FREE);
            self.free_pages += 1;
            if !entry.test(PageFlag::Continues) {
                break;
            }
            index += 1;
        }
    }

    /// Permanently claims every tracked page overlapping `[address, address + size)`.
    ///
    /// The range is clipped to the tracked pages; a range that misses them entirely is
    /// ignored. Pages that are already allocated are left as they are, so reserving the
    /// same range twice has no further effect.
    pub fn reserve(&mut self, address: PhysicalAddress, size: usize) {
        let tracked = self.tracked();
        let requested = MemRegion::new(address.as_usize(), size);
        let start = requested.base.max(tracked.base);
        let end = requested.end().min(tracked.end());
        if start >= end {
            log::debug!(
                "ignoring reservation {}..{} outside tracked memory",
                HumanAddress(requested.base),
                HumanAddress(requested.end())
            );
            return;
        }

        let first = (start - tracked.base) / PAGE_SIZE;
        let last = (end - 1 - tracked.base) / PAGE_SIZE;
        let mut claimed = 0;
        for index in first..=last {
            if self.bitmap.get(index) == Some(PageEntry::FREE) && self.bitmap.set(index, PINNED_PAGE)
            {
                claimed += 1;
            }
        }
        self.free_pages -= claimed;

        log::debug!(
            "reserved {} pages at {}..{}",
            claimed,
            HumanAddress(start),
            HumanAddress(end)
        );
    }

    /// Returns the state of page `index`, or `None` past the last page.
    pub fn page_state(&self, index: usize) -> Option<PageState> {
        self.bitmap.get(index).map(PageEntry::state)
    }

    /// The arena holding the page entries.
    pub fn metadata(&self) -> MemRegion {
        self.metadata
    }

    /// Memory available for allocation, from the first page to the end of the chosen gap.
    pub fn usable(&self) -> MemRegion {
        self.usable
    }

    /// Number of pages tracked.
    pub fn page_count(&self) -> usize {
        self.bitmap.page_count()
    }

    /// Number of tracked pages that are currently free.
    pub fn free_pages(&self) -> usize {
        self.free_pages
    }

    /// Raw arena contents.
    pub fn metadata_bytes(&self) -> &[u8] {
        self.bitmap.as_bytes()
    }

    /// The range covered by tracked pages.
    fn tracked(&self) -> MemRegion {
        MemRegion::new(self.usable.base, self.page_count() * PAGE_SIZE)
    }

    fn page_address(&self, index: usize) -> PhysicalAddress {
        PhysicalAddress::new(self.usable.base + index * PAGE_SIZE)
    }

    fn page_index(&self, address: PhysicalAddress) -> Option<usize> {
        let tracked = self.tracked();
        tracked
            .contains(address.as_usize())
            .then(|| (address.as_usize() - tracked.base) / PAGE_SIZE)
    }
}

impl fmt::Debug for PhysicalMemoryManager<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalMemoryManager")
            .field("metadata", &self.metadata)
            .field("usable", &self.usable)
            .field("page_count", &self.page_count())
            .field("free_pages", &self.free_pages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdt::FdtBuilder;

    const RAM_BASE: usize = 0x8000_0000;
    const MIB: usize = 1024 * 1024;

    fn boot_info(memory: &[(u64, u64)], reserved: &[(u64, u64)]) -> BootInfo {
        let mut builder = FdtBuilder::new();
        for &(base, size) in reserved {
            builder.reserve(base, size);
        }
        builder.begin_node("");
        for &(base, size) in memory {
            builder.begin_node(&format!("memory@{:x}", base));
            builder.property_str("device_type", "memory");
            builder.reg64(&[(base, size)]);
            builder.end_node();
        }
        builder.end_node();
        fdt::parse(&builder.build())
    }

    fn ram(size: usize) -> (BootInfo, AddressTranslator) {
        let info = boot_info(&[(RAM_BASE as u64, size as u64)], &[]);
        (info, AddressTranslator::emulated(RAM_BASE, size))
    }

    #[test]
    fn init_carves_metadata_from_16_mib() {
        let (info, translator) = ram(16 * MIB);
        let pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();

        assert_eq!(pmm.metadata(), MemRegion::new(RAM_BASE, 16 * MIB / (2 * PAGE_SIZE)));
        assert!(pmm.usable().size < 16 * MIB);
        assert_eq!(pmm.usable().base % PAGE_SIZE, 0);
        assert_eq!(pmm.usable().base, RAM_BASE + PAGE_SIZE);
        assert_eq!(pmm.usable().end(), RAM_BASE + 16 * MIB);
        assert!(pmm.metadata().end() <= pmm.usable().base);
        assert_eq!(pmm.page_count(), 16 * MIB / PAGE_SIZE - 1);
        assert!(pmm.page_count() * PAGE_SIZE <= pmm.usable().size);
        assert_eq!(pmm.free_pages(), pmm.page_count());
    }

    #[test]
    fn init_zeroes_stale_metadata() {
        let (info, translator) = ram(MIB);
        if let AddressTranslator::Emulated(memory) = &translator {
            for offset in 0..128 {
                memory.write(RAM_BASE + offset, 0xFF);
            }
        }

        let pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        assert!(pmm.metadata_bytes().iter().all(|&byte| byte == 0));
        assert!((0..pmm.page_count()).all(|i| pmm.page_state(i) == Some(PageState::Free)));
    }

    #[test]
    fn init_aligns_unaligned_region() {
        let base = RAM_BASE + 0x24;
        let info = boot_info(&[(base as u64, MIB as u64)], &[]);
        let translator = AddressTranslator::emulated(RAM_BASE, 2 * MIB);
        let pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();

        assert_eq!(pmm.metadata().base, RAM_BASE + 0x40);
        assert_eq!(pmm.usable().base, RAM_BASE + PAGE_SIZE);
        assert_eq!(pmm.usable().end(), base + MIB);
    }

    #[test]
    fn init_uses_the_gap_after_reservations() {
        let info = boot_info(
            &[(RAM_BASE as u64, 4 * MIB as u64)],
            &[(RAM_BASE as u64, 2 * MIB as u64 + 0x1000)],
        );
        let translator = AddressTranslator::emulated(RAM_BASE, 4 * MIB);
        let pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();

        assert_eq!(pmm.metadata().base, RAM_BASE + 2 * MIB + 0x1000);
        assert!(pmm.usable().end() == RAM_BASE + 4 * MIB);
    }

    #[test]
    fn init_fails_without_memory() {
        let translator = AddressTranslator::emulated(RAM_BASE, PAGE_SIZE);
        let result = PhysicalMemoryManager::init(&BootInfo::empty(), &translator);
        assert_eq!(result.err(), Some(InitError::NoUsableMemory));

        let info = boot_info(&[(RAM_BASE as u64, MIB as u64)], &[(RAM_BASE as u64, MIB as u64)]);
        let result = PhysicalMemoryManager::init(&info, &translator);
        assert_eq!(result.err(), Some(InitError::NoUsableMemory));
    }

    #[test]
    fn init_fails_on_tiny_region() {
        let (info, translator) = ram(PAGE_SIZE);
        let result = PhysicalMemoryManager::init(&info, &translator);
        assert_eq!(result.err(), Some(InitError::RegionTooSmall));
    }

    #[test]
    fn init_fails_when_metadata_is_unreachable() {
        let info = boot_info(&[(RAM_BASE as u64, MIB as u64)], &[]);
        let translator = AddressTranslator::emulated(0x1000, PAGE_SIZE);
        let result = PhysicalMemoryManager::init(&info, &translator);
        assert_eq!(result.err(), Some(InitError::MetadataUnmapped));
    }

    #[test]
    fn excluded_regions_stay_clear_when_reserved_list_is_full() {
        let reserved: Vec<(u64, u64)> = (0..fdt::MAX_RESERVED_REGIONS)
            .map(|i| ((RAM_BASE + i * 2 * PAGE_SIZE) as u64, PAGE_SIZE as u64))
            .collect();
        let info = boot_info(&[(RAM_BASE as u64, (16 * MIB) as u64)], &reserved);
        assert_eq!(info.reserved_regions().len(), fdt::MAX_RESERVED_REGIONS);

        let translator = AddressTranslator::emulated(RAM_BASE, 16 * MIB);
        let AddressTranslator::Emulated(memory) = &translator else {
            panic!("expected emulated translator");
        };
        let image = MemRegion::new(RAM_BASE + MIB, 2 * MIB);
        assert!(memory.write(image.base, 0x5A));

        let pmm = PhysicalMemoryManager::init_excluding(&info, &[image], &translator).unwrap();

        assert_eq!(pmm.metadata().base, image.end());
        assert!(crate::overlap(pmm.metadata(), image).is_empty());
        assert!(crate::overlap(pmm.usable(), image).is_empty());
        assert_eq!(memory.read(image.base), Some(0x5A));
        assert_eq!(pmm.free_pages(), pmm.page_count());
    }

    #[test]
    fn allocate_then_free_restores_bitmap() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        let first = pmm.allocate(PAGE_SIZE).unwrap();
        let before = pmm.metadata_bytes().to_vec();
        let free_before = pmm.free_pages();

        let address = pmm.allocate(3 * PAGE_SIZE + 1).unwrap();
        assert_eq!(pmm.free_pages(), free_before - 4);
        assert_ne!(pmm.metadata_bytes(), &before[..]);

        pmm.free(address);
        assert_eq!(pmm.metadata_bytes(), &before[..]);
        assert_eq!(pmm.free_pages(), free_before);

        pmm.free(first);
        assert!(pmm.metadata_bytes().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn allocations_do_not_overlap() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();

        let sizes = [1, PAGE_SIZE, 2 * PAGE_SIZE + 7, 5 * PAGE_SIZE, 100];
        let regions: Vec<MemRegion> = sizes
            .iter()
            .map(|&size| {
                let address = pmm.allocate(size).unwrap();
                assert!(address.is_aligned(PAGE_SIZE));
                assert!(pmm.usable().contains(address.as_usize()));
                MemRegion::new(address.as_usize(), size.div_ceil(PAGE_SIZE) * PAGE_SIZE)
            })
            .collect();

        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                assert!(a.end() <= b.base || b.end() <= a.base, "{} overlaps {}", a, b);
            }
        }
    }

    #[test]
    fn allocation_is_first_fit() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        let base = pmm.usable().base;

        let a = pmm.allocate(PAGE_SIZE).unwrap();
        let b = pmm.allocate(2 * PAGE_SIZE).unwrap();
        let c = pmm.allocate(PAGE_SIZE).unwrap();
        assert_eq!(a.as_usize(), base);
        assert_eq!(b.as_usize(), base + PAGE_SIZE);
        assert_eq!(c.as_usize(), base + 3 * PAGE_SIZE);

        pmm.free(b);
        assert_eq!(pmm.allocate(PAGE_SIZE).unwrap(), b);
        assert_eq!(pmm.allocate(2 * PAGE_SIZE).unwrap().as_usize(), base + 4 * PAGE_SIZE);
    }

    #[test]
    fn zero_size_allocation_fails() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        assert_eq!(pmm.allocate(0), Err(AllocError::ZeroSize));
    }

    #[test]
    fn allocation_fails_when_exhausted() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        let all = pmm.page_count() * PAGE_SIZE;

        assert_eq!(pmm.allocate(all + PAGE_SIZE), Err(AllocError::OutOfMemory));
        let address = pmm.allocate(all).unwrap();
        assert_eq!(pmm.free_pages(), 0);
        assert_eq!(pmm.allocate(1), Err(AllocError::OutOfMemory));

        pmm.free(address);
        assert_eq!(pmm.free_pages(), pmm.page_count());
    }

    #[test]
    fn out_of_range_free_and_reserve_are_ignored() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        pmm.allocate(PAGE_SIZE).unwrap();
        let bytes = pmm.metadata_bytes().to_vec();
        let free = pmm.free_pages();

        let usable = pmm.usable();
        pmm.free(PhysicalAddress::new(usable.base - PAGE_SIZE));
        pmm.free(PhysicalAddress::new(usable.end()));
        pmm.free(PhysicalAddress::new(0));
        pmm.reserve(PhysicalAddress::new(RAM_BASE), PAGE_SIZE);
        pmm.reserve(PhysicalAddress::new(usable.end()), 16 * PAGE_SIZE);
        pmm.reserve(PhysicalAddress::new(usable.base), 0);

        assert_eq!(pmm.metadata_bytes(), &bytes[..]);
        assert_eq!(pmm.free_pages(), free);
        assert_eq!(pmm.page_state(pmm.page_count()), None);
    }

    #[test]
    fn double_free_is_a_no_op() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        let address = pmm.allocate(2 * PAGE_SIZE).unwrap();

        pmm.free(address);
        let free = pmm.free_pages();
        pmm.free(address);
        assert_eq!(pmm.free_pages(), free);
    }

    #[test]
    fn interior_and_unaligned_frees_are_ignored() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        let address = pmm.allocate(3 * PAGE_SIZE).unwrap();
        let free = pmm.free_pages();

        pmm.free(address + PAGE_SIZE);
        pmm.free(address + 8);
        assert_eq!(pmm.free_pages(), free);
        assert_eq!(pmm.page_state(1), Some(PageState::Allocated));

        pmm.free(address);
        assert_eq!(pmm.free_pages(), pmm.page_count());
    }

    #[test]
    fn reserve_pins_pages() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        let base = pmm.usable().base;
        let total = pmm.page_count();

        // Covers the tail of page 0 through the head of page 2.
        pmm.reserve(PhysicalAddress::new(base + 0x800), 2 * PAGE_SIZE);
        assert_eq!(pmm.free_pages(), total - 3);
        assert_eq!(pmm.page_state(0), Some(PageState::Allocated));
        assert_eq!(pmm.page_state(2), Some(PageState::Allocated));
        assert_eq!(pmm.page_state(3), Some(PageState::Free));

        pmm.reserve(PhysicalAddress::new(base), 3 * PAGE_SIZE);
        assert_eq!(pmm.free_pages(), total - 3);

        pmm.free(PhysicalAddress::new(base));
        assert_eq!(pmm.page_state(0), Some(PageState::Allocated));

        assert_eq!(pmm.allocate(PAGE_SIZE).unwrap().as_usize(), base + 3 * PAGE_SIZE);
    }

    #[test]
    fn reserve_clips_to_tracked_memory() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        let total = pmm.page_count();

        pmm.reserve(PhysicalAddress::new(RAM_BASE), pmm.usable().base - RAM_BASE + PAGE_SIZE);
        assert_eq!(pmm.free_pages(), total - 1);
        assert_eq!(pmm.page_state(0), Some(PageState::Allocated));
        assert_eq!(pmm.page_state(1), Some(PageState::Free));
    }

    #[test]
    fn reserve_keeps_existing_allocations() {
        let (info, translator) = ram(MIB);
        let mut pmm = PhysicalMemoryManager::init(&info, &translator).unwrap();
        let address = pmm.allocate(2 * PAGE_SIZE).unwrap();
        let free = pmm.free_pages();

        pmm.reserve(address, 4 * PAGE_SIZE);
        assert_eq!(pmm.free_pages(), free - 2);

        pmm.free(address);
        assert_eq!(pmm.free_pages(), free);
        assert_eq!(pmm.page_state(0), Some(PageState::Free));
        assert_eq!(pmm.page_state(2), Some(PageState::Allocated));
    }
}
