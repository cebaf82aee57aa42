//! Physical address type and alignment helpers.

use core::fmt;
use core::ops::{Add, Sub};

use crate::HumanAddress;

/// Rounds `value` up to a multiple of `align`, or returns `None` on overflow.
///
/// `align` must be a power of two.
#[inline]
pub const fn align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    match value.checked_add(align - 1) {
        Some(bumped) => Some(bumped & !(align - 1)),
        None => None,
    }
}

/// Rounds `value` down to a multiple of `align`.
#[inline]
pub const fn align_down(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    value & !(align - 1)
}

/// A physical memory address.
///
/// Handed out by [`PhysicalMemoryManager::allocate`](crate::PhysicalMemoryManager::allocate)
/// and accepted by `free`/`reserve`. Nothing is assumed about whether the address is mapped.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysicalAddress(usize);

impl PhysicalAddress {
    /// Creates a new physical address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Returns the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Checks if the address is aligned to `align`, which must be a power of two.
    #[inline]
    pub const fn is_aligned(self, align: usize) -> bool {
        self.0 & (align - 1) == 0
    }

    /// Aligns the address down to `align`.
    #[inline]
    pub const fn align_down(self, align: usize) -> Self {
        Self(align_down(self.0, align))
    }

    /// Aligns the address up to `align`, or returns `None` if that overflows.
    #[inline]
    pub const fn align_up(self, align: usize) -> Option<Self> {
        match align_up(self.0, align) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl fmt::Pointer for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:p}", self.0 as *const u8)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalAddress({:#x})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HumanAddress(self.0))
    }
}

impl From<usize> for PhysicalAddress {
    #[inline]
    fn from(addr: usize) -> Self {
        Self(addr)
    }
}

impl From<PhysicalAddress> for usize {
    #[inline]
    fn from(addr: PhysicalAddress) -> Self {
        addr.0
    }
}

impl Add<usize> for PhysicalAddress {
    type Output = Self;

    #[inline]
    fn add(self, rhs: usize) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<PhysicalAddress> for PhysicalAddress {
    type Output = usize;

    #[inline]
    fn sub(self, rhs: PhysicalAddress) -> Self::Output {
        self.0 - rhs.0
    }
}
