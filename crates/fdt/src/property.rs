//! Decoding of the property values the parser cares about.

use crate::MemRegion;
use crate::endian::read_be;

/// Cell width of a `reg` property, inferred from its byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegCells {
    /// Pairs of 64-bit big-endian values (length is a multiple of 16).
    Wide,
    /// Pairs of 32-bit big-endian values (length is a multiple of 8).
    Narrow,
}

impl RegCells {
    /// Infers the cell width from the property length.
    ///
    /// Multiples of 16 are read as 64-bit pairs, other multiples of 8 as 32-bit pairs.
    /// Anything else (including an empty property) cannot be decoded.
    pub const fn infer(len: usize) -> Option<Self> {
        if len == 0 {
            None
        } else if len % 16 == 0 {
            Some(RegCells::Wide)
        } else if len % 8 == 0 {
            Some(RegCells::Narrow)
        } else {
            None
        }
    }

    /// Size of one (address, size) pair in bytes.
    pub const fn pair_size(self) -> usize {
        match self {
            RegCells::Wide => 16,
            RegCells::Narrow => 8,
        }
    }
}

/// Iterator over the (address, size) pairs of a `reg` property.
#[derive(Debug, Clone)]
pub struct RegIter<'a> {
    value: &'a [u8],
    cells: RegCells,
    offset: usize,
}

impl<'a> RegIter<'a> {
    /// Creates an iterator over `value`, or `None` if its length has no valid encoding.
    pub fn new(value: &'a [u8]) -> Option<Self> {
        let cells = RegCells::infer(value.len())?;
        Some(Self {
            value,
            cells,
            offset: 0,
        })
    }

    /// Returns the inferred cell width.
    pub fn cells(&self) -> RegCells {
        self.cells
    }
}

impl Iterator for RegIter<'_> {
    type Item = MemRegion;

    fn next(&mut self) -> Option<MemRegion> {
        let (base, size) = match self.cells {
            RegCells::Wide => (
                read_be::<u64>(self.value, self.offset)? as usize,
                read_be::<u64>(self.value, self.offset + 8)? as usize,
            ),
            RegCells::Narrow => (
                read_be::<u32>(self.value, self.offset)? as usize,
                read_be::<u32>(self.value, self.offset + 4)? as usize,
            ),
        };
        self.offset += self.cells.pair_size();
        Some(MemRegion::new(base, size))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining =
            (self.value.len() - self.offset.min(self.value.len())) / self.cells.pair_size();
        (remaining, Some(remaining))
    }
}

/// Iterates the NUL-separated strings of a string-list property such as `compatible`.
///
/// A trailing string without a terminator is still yielded; empty entries are skipped.
pub fn string_list(value: &[u8]) -> impl Iterator<Item = &[u8]> {
    value.split(|&b| b == 0).filter(|s| !s.is_empty())
}

/// Returns true if any string in a `compatible` value marks a syscon-class device.
///
/// A string qualifies if it contains `syscon`, `sifive,test` or `shutdown`, or is exactly
/// `simple-mfd`.
pub fn is_syscon_compatible(value: &[u8]) -> bool {
    string_list(value).any(|compatible| {
        contains(compatible, b"syscon")
            || contains(compatible, b"sifive,test")
            || contains(compatible, b"shutdown")
            || compatible == b"simple-mfd"
    })
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
