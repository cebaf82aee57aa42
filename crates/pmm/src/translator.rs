//! Access to physical memory from the running kernel.
//!
//! The memory manager keeps its page arena inside the memory it manages, so it needs a
//! way to turn a physical range into writable bytes. On hardware that is a fixed offset
//! (zero while paging is off). Under test, physical memory is emulated by a heap buffer
//! that pretends to live at some physical base address.

use fdt::MemRegion;

#[cfg(any(test, feature = "software-emulation"))]
use core::cell::UnsafeCell;

#[cfg(any(test, feature = "software-emulation"))]
use alloc::boxed::Box;

/// Translates physical ranges into addressable memory.
pub enum AddressTranslator {
    /// Physical memory is mapped at `phys + direct_map_offset`.
    Hardware { direct_map_offset: usize },
    /// Physical memory is a heap buffer.
    #[cfg(any(test, feature = "software-emulation"))]
    Emulated(EmulatedMemory),
}

impl AddressTranslator {
    /// Creates a hardware translator with the given direct-map offset.
    pub const fn hardware(direct_map_offset: usize) -> Self {
        Self::Hardware { direct_map_offset }
    }

    /// Creates an emulated translator backing `[base, base + size)`.
    #[cfg(any(test, feature = "software-emulation"))]
    pub fn emulated(base: usize, size: usize) -> Self {
        Self::Emulated(EmulatedMemory::new(base, size))
    }

    /// Returns the bytes backing `region`, or `None` if they cannot be reached.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive use of `region` for `'a`: no other live reference
    /// may cover it, and on hardware it must be RAM that nothing else is using.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn bytes_mut<'a>(&'a self, region: MemRegion) -> Option<&'a mut [u8]> {
        match self {
            Self::Hardware { direct_map_offset } => {
                let start = region.base.checked_add(*direct_map_offset)?;
                start.checked_add(region.size)?;
                if start == 0 {
                    return None;
                }
                // SAFETY: The caller guarantees the range is exclusively ours and mapped.
                Some(unsafe { core::slice::from_raw_parts_mut(start as *mut u8, region.size) })
            }
            #[cfg(any(test, feature = "software-emulation"))]
            // SAFETY: Forwarded from the caller.
            Self::Emulated(memory) => unsafe { memory.bytes_mut(region) },
        }
    }
}

/// Heap buffer standing in for a range of physical memory.
#[cfg(any(test, feature = "software-emulation"))]
pub struct EmulatedMemory {
    base: usize,
    memory: Box<[UnsafeCell<u8>]>,
}

#[cfg(any(test, feature = "software-emulation"))]
impl EmulatedMemory {
    /// Creates zeroed memory covering `[base, base + size)`.
    pub fn new(base: usize, size: usize) -> Self {
        Self {
            base,
            memory: (0..size).map(|_| UnsafeCell::new(0)).collect(),
        }
    }

    /// The emulated physical range.
    pub fn region(&self) -> MemRegion {
        MemRegion::new(self.base, self.memory.len())
    }

    /// Returns the bytes for `region`, or `None` if it is not entirely inside this memory.
    ///
    /// # Safety
    ///
    /// No other live reference may cover `region` for `'a`.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn bytes_mut<'a>(&'a self, region: MemRegion) -> Option<&'a mut [u8]> {
        let offset = region.base.checked_sub(self.base)?;
        let cells = self.memory.get(offset..offset.checked_add(region.size)?)?;
        let start = UnsafeCell::raw_get(cells.as_ptr());
        // SAFETY: The cells are in bounds and the caller guarantees exclusivity.
        Some(unsafe { core::slice::from_raw_parts_mut(start, cells.len()) })
    }

    /// Reads one byte at a physical address, for assertions in tests.
    pub fn read(&self, phys: usize) -> Option<u8> {
        let cell = self.memory.get(phys.checked_sub(self.base)?)?;
        // SAFETY: Single-threaded reads of a plain byte.
        Some(unsafe { *cell.get() })
    }

    /// Writes one byte at a physical address.
    pub fn write(&self, phys: usize, value: u8) -> bool {
        let Some(cell) = phys
            .checked_sub(self.base)
            .and_then(|offset| self.memory.get(offset))
        else {
            return false;
        };
        // SAFETY: Single-threaded write of a plain byte.
        unsafe { *cell.get() = value };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emulated_memory_is_addressed_by_physical_base() {
        let translator = AddressTranslator::emulated(0x8000_0000, 0x2000);
        let AddressTranslator::Emulated(memory) = &translator else {
            panic!("expected emulated translator");
        };

        assert!(memory.write(0x8000_0010, 0xAB));
        let bytes = unsafe { translator.bytes_mut(MemRegion::new(0x8000_0000, 0x20)) }.unwrap();
        assert_eq!(bytes.len(), 0x20);
        assert_eq!(bytes[0x10], 0xAB);
        bytes[0x11] = 0xCD;
        assert_eq!(memory.read(0x8000_0011), Some(0xCD));
    }

    #[test]
    fn emulated_memory_rejects_outside_ranges() {
        let translator = AddressTranslator::emulated(0x8000_0000, 0x1000);
        unsafe {
            assert!(translator.bytes_mut(MemRegion::new(0x7fff_f000, 0x10)).is_none());
            assert!(translator.bytes_mut(MemRegion::new(0x8000_0ff0, 0x20)).is_none());
            assert!(translator.bytes_mut(MemRegion::new(0x8000_0ff0, 0x10)).is_some());
        }
        let AddressTranslator::Emulated(memory) = &translator else {
            panic!("expected emulated translator");
        };
        assert_eq!(memory.region(), MemRegion::new(0x8000_0000, 0x1000));
        assert_eq!(memory.read(0x8000_1000), None);
    }

    #[test]
    fn hardware_rejects_overflowing_ranges() {
        let translator = AddressTranslator::hardware(usize::MAX - 0x10);
        let region = MemRegion::new(0x100, 0x10);
        assert!(unsafe { translator.bytes_mut(region) }.is_none());
    }
}
