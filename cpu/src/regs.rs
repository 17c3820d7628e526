//! The register file, the condition flags and the address stack.
//!
//! Seven 8-bit registers are addressable (A and the six
//! general-purpose registers B, C, D, E, H, L).  Register code 7
//! names no storage here: it is the memory pseudo-register, and the
//! sequencer turns any access to it into a bus cycle addressed by
//! H:L.  This module therefore never accepts code 7.
//!
//! The program counter is not a separate register.  The chip keeps
//! eight 14-bit address slots and a 3-bit pointer; the slot the
//! pointer selects *is* the program counter.  A call increments the
//! pointer (modulo 8, without any overflow detection — wraparound is
//! the defined hardware behaviour) and the new slot is then loaded
//! with the target, leaving the return address behind in the old
//! slot.  A return simply decrements the pointer.

use base::prelude::{Address, Condition, ConditionTest, RegisterCode};
use serde::Serialize;

/// The four condition flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Flags {
    pub carry: bool,
    pub zero: bool,
    pub sign: bool,
    pub parity: bool,
}

impl Flags {
    /// Sets zero, sign and parity from a result byte.  Carry is
    /// deliberately untouched: increment and decrement never change
    /// it.
    pub fn set_result(&mut self, value: u8) {
        self.zero = value == 0;
        self.sign = value & 0x80 != 0;
        self.parity = even_parity(value);
    }

    /// Evaluates a conditional instruction's test: true when the
    /// selected flag matches the sense bit.
    #[must_use]
    pub fn test(&self, test: &ConditionTest) -> bool {
        let flag = match test.flag {
            Condition::Carry => self.carry,
            Condition::Zero => self.zero,
            Condition::Sign => self.sign,
            Condition::Parity => self.parity,
        };
        flag == test.sense
    }
}

/// True when the byte has an even number of one bits.
#[must_use]
pub fn even_parity(value: u8) -> bool {
    value.count_ones() % 2 == 0
}

/// The register file and address stack.  Reads are combinational;
/// writes happen only on the commit half-step, under the sequencer's
/// control word.
#[derive(Debug)]
pub struct RegisterFile {
    registers: [u8; 7],
    pub flags: Flags,
    stack: [Address; 8],
    pointer: u8,
}

impl RegisterFile {
    #[must_use]
    pub fn new() -> RegisterFile {
        RegisterFile {
            registers: [0; 7],
            flags: Flags::default(),
            stack: [Address::ZERO; 8],
            pointer: 0,
        }
    }

    /// Reads a physical register.  The memory pseudo-register never
    /// reaches the register array; the sequencer redirects it to the
    /// bus.
    #[must_use]
    pub fn get(&self, code: RegisterCode) -> u8 {
        debug_assert!(!code.is_memory());
        self.registers[code.bits() as usize]
    }

    pub fn set(&mut self, code: RegisterCode, value: u8) {
        debug_assert!(!code.is_memory());
        self.registers[code.bits() as usize] = value;
    }

    /// The 14-bit indirect address: the low six bits of H
    /// concatenated with L.
    #[must_use]
    pub fn indirect_address(&self) -> Address {
        Address::from_parts(self.get(RegisterCode::H), self.get(RegisterCode::L))
    }

    /// The program counter: the active stack slot.
    #[must_use]
    pub fn pc(&self) -> Address {
        self.stack[self.pointer as usize]
    }

    pub fn set_pc(&mut self, address: Address) {
        self.stack[self.pointer as usize] = address;
    }

    pub fn set_pc_low(&mut self, low: u8) {
        self.set_pc(Address::from_parts(self.pc().high(), low));
    }

    pub fn set_pc_high(&mut self, high: u8) {
        self.set_pc(Address::from_parts(high, self.pc().low()));
    }

    pub fn increment_pc(&mut self) {
        self.set_pc(self.pc().successor());
    }

    /// A call's push: the pointer advances (modulo 8) and the new
    /// active slot is about to be loaded with the target.  The old
    /// program counter stays behind in the old slot, which is exactly
    /// how the return address is preserved.
    pub fn push(&mut self) {
        self.pointer = (self.pointer + 1) & 0b111;
    }

    /// A return's pop: the pointer retreats (modulo 8), making the
    /// caller's slot active again.
    pub fn pop(&mut self) {
        self.pointer = self.pointer.wrapping_sub(1) & 0b111;
    }

    #[must_use]
    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    /// The whole stack, for introspection only.
    #[must_use]
    pub fn stack(&self) -> [Address; 8] {
        self.stack
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base::addr;

    #[test]
    fn test_indirect_address_concatenation() {
        let mut regs = RegisterFile::new();
        regs.set(RegisterCode::H, 0x02);
        regs.set(RegisterCode::L, 0x42);
        assert_eq!(regs.indirect_address(), addr!(0x0242));
        // Only six bits of H take part in the address.
        regs.set(RegisterCode::H, 0xff);
        assert_eq!(regs.indirect_address(), addr!(0x3f42));
    }

    #[test]
    fn test_stack_pointer_wraps_modulo_8() {
        let mut regs = RegisterFile::new();
        // Push nine times; the ninth lands back on the first slot.
        for n in 0..9_u16 {
            regs.push();
            regs.set_pc(addr!(0x100 + n));
        }
        assert_eq!(regs.pointer(), 1);
        assert_eq!(regs.pc(), addr!(0x108));
        // The first pushed value (slot 1) has been overwritten.
        assert_eq!(regs.stack()[1], addr!(0x108));
    }

    #[test]
    fn test_pop_wraps_modulo_8() {
        let mut regs = RegisterFile::new();
        regs.pop();
        assert_eq!(regs.pointer(), 7);
    }

    #[test]
    fn test_pc_byte_loads() {
        let mut regs = RegisterFile::new();
        regs.set_pc(addr!(0x0142));
        regs.set_pc_high(0x02);
        assert_eq!(regs.pc(), addr!(0x0242));
        regs.set_pc_low(0x00);
        assert_eq!(regs.pc(), addr!(0x0200));
    }

    #[test]
    fn test_even_parity() {
        assert!(even_parity(0x00));
        assert!(even_parity(0x03));
        assert!(!even_parity(0x08));
        assert!(even_parity(0xff));
    }

    #[test]
    fn test_condition_test() {
        let mut flags = Flags::default();
        flags.carry = true;
        assert!(flags.test(&ConditionTest {
            flag: Condition::Carry,
            sense: true,
        }));
        assert!(!flags.test(&ConditionTest {
            flag: Condition::Carry,
            sense: false,
        }));
        assert!(flags.test(&ConditionTest {
            flag: Condition::Zero,
            sense: false,
        }));
    }
}
