//! Per-page state arena.
//!
//! Every tracked page has a four-bit entry; two entries share a byte, the even page in the
//! low nibble. All access is bounds-checked against the page count.

/// Externally visible state of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Free,
    Allocated,
}

/// Attribute bits of a page entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageFlag {
    /// Page is in use.
    Allocated = 1 << 0,
    /// The allocation continues into the next page.
    Continues = 1 << 1,
    /// Page was claimed by `reserve` and is never released by `free`.
    Pinned = 1 << 2,
}

/// Raw four-bit entry for one page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageEntry(u8);

impl PageEntry {
    pub const FREE: PageEntry = PageEntry(0);
    const MASK: u8 = 0xF;

    /// Builds an entry with the given flags set.
    pub const fn with(flags: &[PageFlag]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < flags.len() {
            bits |= flags[i] as u8;
            i += 1;
        }
        Self(bits)
    }

    /// Tests whether `flag` is set.
    pub const fn test(self, flag: PageFlag) -> bool {
        self.0 & flag as u8 != 0
    }

    pub const fn state(self) -> PageState {
        if self.test(PageFlag::Allocated) {
            PageState::Allocated
        } else {
            PageState::Free
        }
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Bounds-checked view of the metadata arena as page entries.
pub struct PageBitmap<'a> {
    entries: &'a mut [u8],
    page_count: usize,
}

impl<'a> PageBitmap<'a> {
    /// Bytes of arena needed for `page_count` entries.
    pub const fn bytes_for(page_count: usize) -> usize {
        page_count.div_ceil(2)
    }

    /// Wraps `entries`, tracking at most as many pages as the arena can hold.
    ///
    /// The arena is not cleared here.
    pub fn new(entries: &'a mut [u8], page_count: usize) -> Self {
        let page_count = page_count.min(entries.len() * 2);
        Self {
            entries,
            page_count,
        }
    }

    /// Sets every entry to free.
    pub fn clear(&mut self) {
        self.entries.fill(0);
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Returns the entry for page `index`, or `None` past the last page.
    pub fn get(&self, index: usize) -> Option<PageEntry> {
        if index >= self.page_count {
            return None;
        }
        let byte = self.entries[index / 2];
        let shift = (index % 2) * 4;
        Some(PageEntry((byte >> shift) & PageEntry::MASK))
    }

    /// Stores `entry` for page `index`. Returns `false` (and changes nothing) if the index
    /// is out of range.
    pub fn set(&mut self, index: usize, entry: PageEntry) -> bool {
        if index >= self.page_count {
            return false;
        }
        let shift = (index % 2) * 4;
        let byte = &mut self.entries[index / 2];
        *byte = (*byte & !(PageEntry::MASK << shift)) | ((entry.0 & PageEntry::MASK) << shift);
        true
    }

    /// Finds the first run of `count` consecutive free pages, returning its first index.
    pub fn find_free_run(&self, count: usize) -> Option<usize> {
        if count == 0 || count > self.page_count {
            return None;
        }

        let mut run_start = 0;
        let mut run_len = 0;
        for index in 0..self.page_count {
            if self.get(index)? == PageEntry::FREE {
                if run_len == 0 {
                    run_start = index;
                }
                run_len += 1;
                if run_len == count {
                    return Some(run_start);
                }
            } else {
                run_len = 0;
            }
        }
        None
    }

    /// Raw arena bytes, for snapshots in tests and diagnostics.
    pub fn as_bytes(&self) -> &[u8] {
        self.entries
    }
}
