//! Human-readable formatting for addresses and sizes in log output.

use core::fmt;

/// Formats an address as uppercase hex with a `0x` prefix and a `_` every four digits.
///
/// # Examples
///
/// ```
/// use pmm::HumanAddress;
///
/// assert_eq!(format!("{}", HumanAddress(0x0)), "0x0");
/// assert_eq!(format!("{}", HumanAddress(0x8020_0000)), "0x8020_0000");
/// assert_eq!(format!("{}", HumanAddress(0x1_0000)), "0x1_0000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HumanAddress(pub usize);

impl fmt::Display for HumanAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        let bits = usize::BITS - value.leading_zeros();
        let digits = (bits.div_ceil(4) as usize).max(1);

        write!(f, "0x")?;
        for i in (0..digits).rev() {
            let digit = (value >> (i * 4)) & 0xF;
            write!(f, "{:X}", digit)?;
            if i != 0 && i % 4 == 0 {
                write!(f, "_")?;
            }
        }
        Ok(())
    }
}

/// Formats a byte count with binary prefixes and up to two decimals, e.g. `1.5KiB`.
///
/// # Examples
///
/// ```
/// use pmm::HumanSize;
///
/// assert_eq!(format!("{}", HumanSize(1023)), "1023B");
/// assert_eq!(format!("{}", HumanSize(1536)), "1.5KiB");
/// assert_eq!(format!("{}", HumanSize(16 * 1024 * 1024)), "16MiB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HumanSize(pub usize);

impl HumanSize {
    /// Size in whole mebibytes, rounded down.
    pub const fn mebibytes(self) -> usize {
        self.0 >> 20
    }
}

impl fmt::Display for HumanSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

        let bytes = self.0 as u128;
        let mut unit = 0;
        while unit + 1 < UNITS.len() && bytes >> (10 * (unit + 1)) != 0 {
            unit += 1;
        }

        let shift = 10 * unit;
        let mut whole = bytes >> shift;
        let remainder = bytes & ((1u128 << shift) - 1);
        // Hundredths, rounded to nearest.
        let mut hundredths = if shift == 0 {
            0
        } else {
            (remainder * 100 + (1u128 << (shift - 1))) >> shift
        };
        if hundredths == 100 {
            whole += 1;
            hundredths = 0;
        }

        match hundredths {
            0 => write!(f, "{}{}", whole, UNITS[unit]),
            h if h % 10 == 0 => write!(f, "{}.{}{}", whole, h / 10, UNITS[unit]),
            h => write!(f, "{}.{:02}{}", whole, h, UNITS[unit]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_addresses() {
        assert_eq!(format!("{}", HumanAddress(0)), "0x0");
        assert_eq!(format!("{}", HumanAddress(0xF)), "0xF");
        assert_eq!(format!("{}", HumanAddress(0xABCD)), "0xABCD");
        assert_eq!(format!("{}", HumanAddress(0x12_3456)), "0x12_3456");
        assert_eq!(format!("{}", HumanAddress(0x1000_0000)), "0x1000_0000");
        assert_eq!(
            format!("{}", HumanAddress(0xFFFF_FFFF_FFFF_FFFF)),
            "0xFFFF_FFFF_FFFF_FFFF"
        );
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format!("{}", HumanSize(0)), "0B");
        assert_eq!(format!("{}", HumanSize(512)), "512B");
        assert_eq!(format!("{}", HumanSize(1024)), "1KiB");
        assert_eq!(format!("{}", HumanSize(1536)), "1.5KiB");
        assert_eq!(format!("{}", HumanSize(1280)), "1.25KiB");
        assert_eq!(format!("{}", HumanSize(128 * 1024 * 1024)), "128MiB");
        assert_eq!(format!("{}", HumanSize(1610612736)), "1.5GiB");
    }

    #[test]
    fn rounds_up_into_the_next_whole() {
        // 2047 bytes is 1.999 KiB.
        assert_eq!(format!("{}", HumanSize(2047)), "2KiB");
    }

    #[test]
    fn whole_mebibytes() {
        assert_eq!(HumanSize(16 * 1024 * 1024 - 4096).mebibytes(), 15);
        assert_eq!(HumanSize(16 * 1024 * 1024).mebibytes(), 16);
    }
}
