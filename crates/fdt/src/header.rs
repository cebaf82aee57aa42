//! The fixed header at the start of every flattened device tree.

use core::fmt;

use crate::endian::read_be;

/// Magic number at offset 0 of a device tree blob.
pub const FDT_MAGIC: u32 = 0xd00d_feed;

/// Size of the header in bytes (ten 32-bit fields).
pub const HEADER_SIZE: usize = 40;

/// Errors found while validating the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// The blob is shorter than the header.
    TooShort,
    /// The magic number does not match [`FDT_MAGIC`].
    BadMagic(u32),
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::TooShort => write!(f, "blob shorter than header"),
            HeaderError::BadMagic(magic) => write!(f, "invalid magic {:#010x}", magic),
        }
    }
}

/// Decoded header fields, in blob order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdtHeader {
    pub magic: u32,
    pub total_size: u32,
    pub off_dt_struct: u32,
    pub off_dt_strings: u32,
    pub off_mem_rsvmap: u32,
    pub version: u32,
    pub last_comp_version: u32,
    pub boot_cpuid_phys: u32,
    pub size_dt_strings: u32,
    pub size_dt_struct: u32,
}

impl FdtHeader {
    /// Decodes and validates the header at the start of `blob`.
    pub fn parse(blob: &[u8]) -> Result<Self, HeaderError> {
        let field = |index: usize| read_be::<u32>(blob, index * 4).ok_or(HeaderError::TooShort);

        let magic = field(0)?;
        if magic != FDT_MAGIC {
            return Err(HeaderError::BadMagic(magic));
        }

        Ok(Self {
            magic,
            total_size: field(1)?,
            off_dt_struct: field(2)?,
            off_dt_strings: field(3)?,
            off_mem_rsvmap: field(4)?,
            version: field(5)?,
            last_comp_version: field(6)?,
            boot_cpuid_phys: field(7)?,
            size_dt_strings: field(8)?,
            size_dt_struct: field(9)?,
        })
    }

    /// Returns the `len`-byte block starting at `offset` in `blob`.
    ///
    /// A zero `len`, or one reaching past the end of the blob, extends the block to the end
    /// of the blob. Returns an empty slice if `offset` itself is out of bounds.
    pub(crate) fn block<'a>(blob: &'a [u8], offset: u32, len: u32) -> &'a [u8] {
        let Some(rest) = blob.get(offset as usize..) else {
            return &[];
        };
        match rest.get(..len as usize) {
            Some(block) if len != 0 => block,
            _ => rest,
        }
    }

    /// Returns the structure block.
    pub(crate) fn structure_block<'a>(&self, blob: &'a [u8]) -> &'a [u8] {
        Self::block(blob, self.off_dt_struct, self.size_dt_struct)
    }

    /// Returns the strings block.
    pub(crate) fn strings_block<'a>(&self, blob: &'a [u8]) -> &'a [u8] {
        Self::block(blob, self.off_dt_strings, self.size_dt_strings)
    }

    /// Returns everything from the memory reservation table to the end of the blob.
    pub(crate) fn reservation_table<'a>(&self, blob: &'a [u8]) -> &'a [u8] {
        Self::block(blob, self.off_mem_rsvmap, 0)
    }
}
