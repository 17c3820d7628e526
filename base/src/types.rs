//! The processor addresses 16K of memory through a 14-bit address
//! which it multiplexes over its 8-bit bus: the low eight bits are
//! presented during the first timing state of a machine cycle, the
//! remaining six (together with a two-bit cycle-type tag) during the
//! second.  `Address` represents such a 14-bit value.
//!
//! Address arithmetic on the real chip is performed by a counter
//! circuit attached to the active stack slot, not by the adder, and
//! it simply wraps at the top of the address space.  `successor`
//! reproduces that behaviour.
use std::fmt::{self, Debug, Display, Formatter, LowerHex, Octal};

use serde::Serialize;

/// Number of significant bits in an address.
pub const ADDRESS_BITS: u32 = 14;

/// Mask selecting the significant bits of an address.
pub const ADDRESS_MASK: u16 = (1 << ADDRESS_BITS) - 1;

/// A 14-bit memory address.
///
/// Constructors mask their input down to 14 bits, because that is
/// what the hardware's address path does; there is no representable
/// out-of-range address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Address {
    bits: u16,
}

impl Address {
    pub const ZERO: Address = Address { bits: 0 };
    pub const MAX: Address = Address { bits: ADDRESS_MASK };

    #[must_use]
    pub const fn new(bits: u16) -> Address {
        Address {
            bits: bits & ADDRESS_MASK,
        }
    }

    /// Reassembles an address from the two bytes the bus protocol
    /// splits it into.  The upper byte has only six significant bits;
    /// the top two (the cycle-type tag position) are discarded.
    #[must_use]
    pub const fn from_parts(high: u8, low: u8) -> Address {
        Address::new((((high & 0x3f) as u16) << 8) | low as u16)
    }

    /// The low eight address bits, presented during the first
    /// address-output state.
    #[must_use]
    pub const fn low(&self) -> u8 {
        (self.bits & 0xff) as u8
    }

    /// The high six address bits, presented during the second
    /// address-output state (below the cycle-type tag).
    #[must_use]
    pub const fn high(&self) -> u8 {
        (self.bits >> 8) as u8
    }

    /// The next address, wrapping at the top of the 16K space.
    #[must_use]
    pub const fn successor(&self) -> Address {
        Address::new(self.bits.wrapping_add(1))
    }

    /// The fixed target of restart slot `n` (0..=7): eight bytes per
    /// slot, starting at address zero.
    #[must_use]
    pub const fn restart_vector(n: u8) -> Address {
        Address::new(((n & 0b111) as u16) << 3)
    }
}

impl From<u16> for Address {
    fn from(bits: u16) -> Address {
        Address::new(bits)
    }
}

impl From<Address> for u16 {
    fn from(a: Address) -> u16 {
        a.bits
    }
}

impl From<Address> for usize {
    fn from(a: Address) -> usize {
        usize::from(a.bits)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{:#06x}", self.bits)
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Address({:#06x})", self.bits)
    }
}

impl LowerHex for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        LowerHex::fmt(&self.bits, f)
    }
}

impl Octal for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        Octal::fmt(&self.bits, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_new_masks_to_14_bits() {
        assert_eq!(u16::from(Address::new(0xffff)), 0x3fff);
        assert_eq!(u16::from(Address::new(0x4000)), 0);
        assert_eq!(u16::from(Address::new(0x0142)), 0x0142);
    }

    #[test]
    fn test_successor_wraps() {
        assert_eq!(Address::MAX.successor(), Address::ZERO);
        assert_eq!(Address::new(0x0142).successor(), Address::new(0x0143));
    }

    #[test]
    fn test_restart_vectors() {
        assert_eq!(Address::restart_vector(0), Address::ZERO);
        assert_eq!(Address::restart_vector(1), Address::new(0x0008));
        assert_eq!(Address::restart_vector(7), Address::new(0x0038));
    }

    #[proptest]
    fn test_parts_round_trip(bits: u16) {
        let a = Address::new(bits);
        assert_eq!(Address::from_parts(a.high(), a.low()), a);
    }

    #[proptest]
    fn test_high_has_six_bits(bits: u16) {
        assert!(Address::new(bits).high() <= 0x3f);
    }
}
