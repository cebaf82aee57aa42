//! Big-endian field decoding.
//!
//! Every multi-byte value in a flattened device tree is stored big-endian. All reads in
//! this crate go through [`FromBigEndian`] so that 32-bit and 64-bit fields are converted
//! the same way, and every read is bounds-checked against the slice it comes from.

/// A fixed-width integer that can be decoded from big-endian bytes.
pub trait FromBigEndian: Sized + Copy {
    /// Width of the encoded value in bytes.
    const WIDTH: usize;

    /// Decodes a value from exactly [`Self::WIDTH`] bytes.
    ///
    /// Returns `None` if `bytes` has the wrong length.
    fn from_be_slice(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_from_big_endian {
    ($($ty:ty),*) => {
        $(
            impl FromBigEndian for $ty {
                const WIDTH: usize = core::mem::size_of::<$ty>();

                #[inline]
                fn from_be_slice(bytes: &[u8]) -> Option<Self> {
                    let array: [u8; core::mem::size_of::<$ty>()] = bytes.try_into().ok()?;
                    Some(<$ty>::from_be_bytes(array))
                }
            }
        )*
    };
}

impl_from_big_endian!(u32, u64);

/// Reads a big-endian value at `offset` in `bytes`.
///
/// Returns `None` if the value would extend past the end of the slice.
#[inline]
pub fn read_be<T: FromBigEndian>(bytes: &[u8], offset: usize) -> Option<T> {
    let end = offset.checked_add(T::WIDTH)?;
    T::from_be_slice(bytes.get(offset..end)?)
}

/// Rounds `value` up to the next multiple of four (the structure block alignment).
#[inline]
pub const fn align4(value: usize) -> usize {
    (value + 3) & !3
}

/// A forward-only reader over a byte slice.
///
/// The cursor never reads outside its slice; every accessor returns `None` instead.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor positioned at the start of `data`.
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Returns the current offset from the start of the slice.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Reads a big-endian value and advances past it.
    pub fn read<T: FromBigEndian>(&mut self) -> Option<T> {
        let value = read_be::<T>(self.data, self.offset)?;
        self.offset += T::WIDTH;
        Some(value)
    }

    /// Takes the next `len` bytes and advances past them.
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(len)?;
        let bytes = self.data.get(self.offset..end)?;
        self.offset = end;
        Some(bytes)
    }

    /// Takes a NUL-terminated byte string, returning it without the terminator.
    ///
    /// The cursor is left just past the terminator. Returns `None` if no terminator is
    /// found before the end of the slice.
    pub fn take_cstr(&mut self) -> Option<&'a [u8]> {
        let rest = self.data.get(self.offset..)?;
        let len = rest.iter().position(|&b| b == 0)?;
        self.offset += len + 1;
        Some(&rest[..len])
    }

    /// Advances to the next four-byte boundary.
    ///
    /// The offset may end up past the end of the slice, in which case the next read fails.
    pub fn align(&mut self) {
        self.offset = align4(self.offset);
    }
}

/// Returns the NUL-terminated byte string starting at `offset`, without the terminator.
///
/// Returns `None` if `offset` is out of bounds or the string is not terminated within
/// `bytes`.
pub fn cstr_at(bytes: &[u8], offset: usize) -> Option<&[u8]> {
    let rest = bytes.get(offset..)?;
    let len = rest.iter().position(|&b| b == 0)?;
    Some(&rest[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_u32_and_u64() {
        let bytes = [
            0xd0, 0x0d, 0xfe, 0xed, 0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00,
        ];
        assert_eq!(read_be::<u32>(&bytes, 0), Some(0xd00d_feed));
        assert_eq!(read_be::<u64>(&bytes, 4), Some(0x0000_0000_8000_0000));
    }

    #[test]
    fn rejects_reads_past_the_end() {
        let bytes = [0u8; 6];
        assert_eq!(read_be::<u32>(&bytes, 3), None);
        assert_eq!(read_be::<u64>(&bytes, 0), None);
        assert_eq!(read_be::<u32>(&bytes, usize::MAX), None);
    }

    #[test]
    fn cursor_aligns_after_names() {
        let bytes = b"cpu@0\0\0\0\x00\x00\x00\x02";
        let mut cursor = Cursor::new(bytes);
        assert_eq!(cursor.take_cstr(), Some(&b"cpu@0"[..]));
        assert_eq!(cursor.offset(), 6);
        cursor.align();
        assert_eq!(cursor.offset(), 8);
        assert_eq!(cursor.read::<u32>(), Some(2));
        assert_eq!(cursor.read::<u32>(), None);
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let mut cursor = Cursor::new(b"memory");
        assert_eq!(cursor.take_cstr(), None);
        assert_eq!(cstr_at(b"reg\0", 0), Some(&b"reg"[..]));
        assert_eq!(cstr_at(b"reg", 0), None);
        assert_eq!(cstr_at(b"reg\0", 9), None);
    }

    #[test]
    fn align4_rounds_up() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(4), 4);
        assert_eq!(align4(5), 8);
    }
}
