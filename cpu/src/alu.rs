//! The arithmetic/logic unit.
//!
//! The ALU is purely combinational: a function of two 8-bit operands,
//! a carry-in and an operation code, producing a 9-bit result (8 bits
//! of value plus carry-out).  It holds no state; the sequencer
//! invokes it at the commit half-step that retires an arithmetic
//! instruction.  The accumulator rotates are implemented here too,
//! although on the real chip they use a separate shifter path.

use base::prelude::{AluFunction, RotateKind};

/// The 9-bit result of an ALU or rotate operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AluOutput {
    pub value: u8,
    pub carry: bool,
}

/// Evaluates an ALU function.  Carry-out is bit 8 of the unsigned
/// 9-bit sum (or difference); the logical operations always clear it.
/// Compare is computed exactly as subtract; the caller discards the
/// value and keeps the flags.
#[must_use]
pub fn evaluate(function: AluFunction, a: u8, b: u8, carry_in: bool) -> AluOutput {
    match function {
        AluFunction::Add => add(a, b, false),
        AluFunction::AddWithCarry => add(a, b, carry_in),
        AluFunction::Subtract | AluFunction::Compare => subtract(a, b, false),
        AluFunction::SubtractWithBorrow => subtract(a, b, carry_in),
        AluFunction::And => logical(a & b),
        AluFunction::Xor => logical(a ^ b),
        AluFunction::Or => logical(a | b),
    }
}

fn add(a: u8, b: u8, carry_in: bool) -> AluOutput {
    let wide = u16::from(a) + u16::from(b) + u16::from(carry_in);
    AluOutput {
        value: (wide & 0xff) as u8,
        carry: wide & 0x100 != 0,
    }
}

fn subtract(a: u8, b: u8, borrow_in: bool) -> AluOutput {
    let wide = u16::from(a)
        .wrapping_sub(u16::from(b))
        .wrapping_sub(u16::from(borrow_in));
    AluOutput {
        value: (wide & 0xff) as u8,
        // The borrow appears as bit 8 of the two's-complement-style
        // difference.
        carry: wide & 0x100 != 0,
    }
}

fn logical(value: u8) -> AluOutput {
    AluOutput {
        value,
        carry: false,
    }
}

/// Rotates the accumulator one bit position.  Only the carry flag is
/// affected; zero, sign and parity are left alone by the caller.
#[must_use]
pub fn rotate(kind: RotateKind, a: u8, carry_in: bool) -> AluOutput {
    match kind {
        RotateKind::LeftCircular => AluOutput {
            value: a.rotate_left(1),
            carry: a & 0x80 != 0,
        },
        RotateKind::RightCircular => AluOutput {
            value: a.rotate_right(1),
            carry: a & 0x01 != 0,
        },
        RotateKind::LeftThroughCarry => AluOutput {
            value: (a << 1) | u8::from(carry_in),
            carry: a & 0x80 != 0,
        },
        RotateKind::RightThroughCarry => AluOutput {
            value: (a >> 1) | (u8::from(carry_in) << 7),
            carry: a & 0x01 != 0,
        },
    }
}
