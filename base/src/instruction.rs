//! Binary and symbolic representations of processor instructions.
//!
//! An instruction opcode occupies 8 bits.  The bits look like this
//! (most significant bit on the left):
//!
//! |Class  |Destination / sense+condition / function|Source / low group|
//! |-------|----------------------------------------|------------------|
//! |2 bits |3 bits                                  |3 bits            |
//! |(7-6)  |(5-3)                                   |(2-0)             |
//!
//! The class field selects one of four instruction groups:
//!
//! - `00`: the index-register group, a mixed bag: halt, immediate
//!   loads, increment/decrement, the ALU-immediate operations, the
//!   four rotates, restart, and the returns.  The low three bits pick
//!   the member, the middle three carry the register, ALU function or
//!   condition.
//! - `01`: program-counter and stack control plus input/output.  Odd
//!   opcodes are I/O (the port number lives in bits 5-1); even
//!   opcodes are the jumps and calls.
//! - `10`: the ALU operations on a register or memory operand.
//! - `11`: register-to-register and register-memory moves.
//!
//! Register code 7 does not name a physical register: it refers to
//! the memory location addressed by H and L (see
//! [`RegisterCode::is_memory`]).  The decoder special-cases it
//! throughout.
//!
//! The opcode map has a few genuinely unused encodings (an
//! increment or decrement of the memory pseudo-register, and the
//! upper half of the rotate row).  These decode to
//! [`InstructionKind::Undefined`], which executes as a one-cycle
//! no-op.  The one-byte pattern `0xff` would be a move from memory to
//! memory; the hardware documentation leaves it undefined and this
//! decoder classifies it as [`InstructionKind::Illegal`].

use serde::Serialize;

mod format;

/// One of the seven addressable registers, or the memory
/// pseudo-register (code 7) which redirects the access to the address
/// formed from H and L.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RegisterCode {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    E = 4,
    H = 5,
    L = 6,
    M = 7,
}

impl RegisterCode {
    /// Decodes a three-bit register field.
    #[must_use]
    pub fn from_bits(bits: u8) -> RegisterCode {
        match bits & 0b111 {
            0 => RegisterCode::A,
            1 => RegisterCode::B,
            2 => RegisterCode::C,
            3 => RegisterCode::D,
            4 => RegisterCode::E,
            5 => RegisterCode::H,
            6 => RegisterCode::L,
            7 => RegisterCode::M,
            _ => unreachable!(),
        }
    }

    #[must_use]
    pub fn bits(&self) -> u8 {
        *self as u8
    }

    /// True for the memory pseudo-register.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        matches!(self, RegisterCode::M)
    }
}

/// The flag selected by a conditional jump, call or return.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Condition {
    Carry = 0,
    Zero = 1,
    Sign = 2,
    Parity = 3,
}

impl Condition {
    #[must_use]
    pub fn from_bits(bits: u8) -> Condition {
        match bits & 0b11 {
            0 => Condition::Carry,
            1 => Condition::Zero,
            2 => Condition::Sign,
            3 => Condition::Parity,
            _ => unreachable!(),
        }
    }

    #[must_use]
    pub fn bits(&self) -> u8 {
        *self as u8
    }
}

/// A condition field together with its sense bit.  The instruction is
/// taken when the selected flag equals `sense`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ConditionTest {
    pub flag: Condition,
    pub sense: bool,
}

impl ConditionTest {
    fn from_opcode(opcode: u8) -> ConditionTest {
        ConditionTest {
            flag: Condition::from_bits(opcode >> 3),
            sense: opcode & 0b0010_0000 != 0,
        }
    }

    fn encode_bits(&self) -> u8 {
        (u8::from(self.sense) << 5) | (self.flag.bits() << 3)
    }
}

/// The eight ALU functions.  Compare is computed exactly like
/// subtract; the caller discards the result and keeps the flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AluFunction {
    Add = 0,
    AddWithCarry = 1,
    Subtract = 2,
    SubtractWithBorrow = 3,
    And = 4,
    Xor = 5,
    Or = 6,
    Compare = 7,
}

impl AluFunction {
    #[must_use]
    pub fn from_bits(bits: u8) -> AluFunction {
        match bits & 0b111 {
            0 => AluFunction::Add,
            1 => AluFunction::AddWithCarry,
            2 => AluFunction::Subtract,
            3 => AluFunction::SubtractWithBorrow,
            4 => AluFunction::And,
            5 => AluFunction::Xor,
            6 => AluFunction::Or,
            7 => AluFunction::Compare,
            _ => unreachable!(),
        }
    }

    #[must_use]
    pub fn bits(&self) -> u8 {
        *self as u8
    }
}

/// The four accumulator rotates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RotateKind {
    /// Rotate left; bit 7 goes to both bit 0 and Carry.
    LeftCircular = 0,
    /// Rotate right; bit 0 goes to both bit 7 and Carry.
    RightCircular = 1,
    /// Rotate left through Carry.
    LeftThroughCarry = 2,
    /// Rotate right through Carry.
    RightThroughCarry = 3,
}

impl RotateKind {
    #[must_use]
    pub fn from_bits(bits: u8) -> RotateKind {
        match bits & 0b11 {
            0 => RotateKind::LeftCircular,
            1 => RotateKind::RightCircular,
            2 => RotateKind::LeftThroughCarry,
            3 => RotateKind::RightThroughCarry,
            _ => unreachable!(),
        }
    }

    #[must_use]
    pub fn bits(&self) -> u8 {
        *self as u8
    }
}

/// The instruction group selected by the top two opcode bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum InstructionClass {
    /// `00`: the mixed index-register group.
    Index,
    /// `01`: jumps, calls, returns-by-extension and input/output.
    Control,
    /// `10`: ALU operations on a register or memory operand.
    Accumulator,
    /// `11`: moves.
    Move,
}

impl InstructionClass {
    fn from_opcode(opcode: u8) -> InstructionClass {
        match opcode >> 6 {
            0b00 => InstructionClass::Index,
            0b01 => InstructionClass::Control,
            0b10 => InstructionClass::Accumulator,
            0b11 => InstructionClass::Move,
            _ => unreachable!(),
        }
    }
}

/// The specific operation an opcode denotes, with its decoded fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum InstructionKind {
    /// Stops the two-phase clock's effect; only an interrupt restarts
    /// the machine.  Two encodings exist (0x00 and 0x01).
    Halt,
    /// Register-to-register move (source and destination both
    /// physical).
    MoveRegister {
        destination: RegisterCode,
        source: RegisterCode,
    },
    /// Move from the H:L-addressed memory location to a register.
    MoveFromMemory { destination: RegisterCode },
    /// Move from a register to the H:L-addressed memory location.
    MoveToMemory { source: RegisterCode },
    /// Load a register from the byte following the opcode.
    MoveImmediate { destination: RegisterCode },
    /// Store the byte following the opcode to the H:L-addressed
    /// memory location.
    MoveImmediateToMemory,
    /// ALU operation, second operand from a physical register.
    AluRegister {
        function: AluFunction,
        source: RegisterCode,
    },
    /// ALU operation, second operand from the H:L-addressed memory
    /// location.
    AluMemory { function: AluFunction },
    /// ALU operation, second operand from the byte following the
    /// opcode.
    AluImmediate { function: AluFunction },
    /// Increment a register (never the accumulator; that encoding is
    /// a halt).  Updates Zero/Sign/Parity, never Carry.
    Increment { register: RegisterCode },
    /// Decrement a register.  Updates Zero/Sign/Parity, never Carry.
    Decrement { register: RegisterCode },
    /// Rotate the accumulator.  Updates Carry only.
    Rotate { kind: RotateKind },
    /// Jump, unconditionally or on a flag test.
    Jump { condition: Option<ConditionTest> },
    /// Call, unconditionally or on a flag test.  The conditional form
    /// is a documented extension of the original instruction list.
    Call { condition: Option<ConditionTest> },
    /// Return, unconditionally or on a flag test.
    Return { condition: Option<ConditionTest> },
    /// One-byte call to one of the eight fixed restart vectors.
    Restart { slot: u8 },
    /// Read a byte from one of input ports 0..=7 into the
    /// accumulator.
    Input { port: u8 },
    /// Write the accumulator to one of output ports 8..=31.
    Output { port: u8 },
    /// A bit pattern the decoder does not recognise; executes as a
    /// one-cycle no-op.
    Undefined,
    /// The memory-to-memory move pattern (0xff), which the hardware
    /// documentation leaves undefined.  Execution raises a fatal
    /// alarm rather than guessing.
    Illegal,
}

/// A decoded instruction: the raw opcode byte plus the structured
/// description of what it does.  Decoding is pure; the same byte
/// always produces the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DecodedInstruction {
    opcode: u8,
    kind: InstructionKind,
}

impl DecodedInstruction {
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    #[must_use]
    pub fn kind(&self) -> InstructionKind {
        self.kind
    }

    #[must_use]
    pub fn class(&self) -> InstructionClass {
        InstructionClass::from_opcode(self.opcode)
    }

    /// The raw three-bit destination field (bits 5-3).
    #[must_use]
    pub fn destination_field(&self) -> u8 {
        (self.opcode >> 3) & 0b111
    }

    /// The raw three-bit source field (bits 2-0).
    #[must_use]
    pub fn source_field(&self) -> u8 {
        self.opcode & 0b111
    }

    /// The raw three-bit ALU function field (bits 5-3).
    #[must_use]
    pub fn function_field(&self) -> u8 {
        (self.opcode >> 3) & 0b111
    }

    /// The condition field with its sense bit, as encoded in bits
    /// 5-3.  Meaningful only for the conditional flow instructions.
    #[must_use]
    pub fn condition_field(&self) -> ConditionTest {
        ConditionTest::from_opcode(self.opcode)
    }

    /// The five-bit I/O port field (bits 5-1).
    #[must_use]
    pub fn port_field(&self) -> u8 {
        (self.opcode >> 1) & 0b1_1111
    }

    /// True when the instruction consumes a data byte following the
    /// opcode.
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::MoveImmediate { .. }
                | InstructionKind::MoveImmediateToMemory
                | InstructionKind::AluImmediate { .. }
        )
    }

    /// True when the operand source is the memory pseudo-register.
    #[must_use]
    pub fn source_is_memory(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::MoveFromMemory { .. }
                | InstructionKind::AluMemory { .. }
                | InstructionKind::Illegal
        )
    }

    /// True when the operand destination is the memory
    /// pseudo-register.
    #[must_use]
    pub fn destination_is_memory(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::MoveToMemory { .. }
                | InstructionKind::MoveImmediateToMemory
                | InstructionKind::Illegal
        )
    }
}

/// Decodes an opcode byte.  Total and pure: every byte maps to some
/// [`DecodedInstruction`], with the unused patterns mapping to
/// [`InstructionKind::Undefined`] and the memory-to-memory move to
/// [`InstructionKind::Illegal`].
#[must_use]
pub fn decode(opcode: u8) -> DecodedInstruction {
    let kind = match opcode >> 6 {
        0b00 => decode_index_group(opcode),
        0b01 => decode_control_group(opcode),
        0b10 => decode_accumulator_group(opcode),
        0b11 => decode_move_group(opcode),
        _ => unreachable!(),
    };
    DecodedInstruction { opcode, kind }
}

fn decode_index_group(opcode: u8) -> InstructionKind {
    let field = RegisterCode::from_bits(opcode >> 3);
    match opcode & 0b111 {
        0b000 | 0b001 if field == RegisterCode::A => InstructionKind::Halt,
        0b000 | 0b001 if field == RegisterCode::M => InstructionKind::Undefined,
        0b000 => InstructionKind::Increment { register: field },
        0b001 => InstructionKind::Decrement { register: field },
        0b010 => {
            if opcode & 0b0010_0000 == 0 {
                InstructionKind::Rotate {
                    kind: RotateKind::from_bits(opcode >> 3),
                }
            } else {
                InstructionKind::Undefined
            }
        }
        0b011 => InstructionKind::Return {
            condition: Some(ConditionTest::from_opcode(opcode)),
        },
        0b100 => InstructionKind::AluImmediate {
            function: AluFunction::from_bits(opcode >> 3),
        },
        0b101 => InstructionKind::Restart {
            slot: (opcode >> 3) & 0b111,
        },
        0b110 => {
            if field == RegisterCode::M {
                InstructionKind::MoveImmediateToMemory
            } else {
                InstructionKind::MoveImmediate { destination: field }
            }
        }
        // The middle bits are don't-cares: all eight patterns return.
        0b111 => InstructionKind::Return { condition: None },
        _ => unreachable!(),
    }
}

fn decode_control_group(opcode: u8) -> InstructionKind {
    if opcode & 1 == 1 {
        let port = (opcode >> 1) & 0b1_1111;
        if port < 8 {
            InstructionKind::Input { port }
        } else {
            InstructionKind::Output { port }
        }
    } else {
        match opcode & 0b111 {
            0b000 => InstructionKind::Jump {
                condition: Some(ConditionTest::from_opcode(opcode)),
            },
            0b010 => InstructionKind::Call {
                condition: Some(ConditionTest::from_opcode(opcode)),
            },
            // The middle bits are don't-cares for the unconditional
            // forms.
            0b100 => InstructionKind::Jump { condition: None },
            0b110 => InstructionKind::Call { condition: None },
            _ => unreachable!(),
        }
    }
}

fn decode_accumulator_group(opcode: u8) -> InstructionKind {
    let function = AluFunction::from_bits(opcode >> 3);
    let source = RegisterCode::from_bits(opcode);
    if source.is_memory() {
        InstructionKind::AluMemory { function }
    } else {
        InstructionKind::AluRegister { function, source }
    }
}

fn decode_move_group(opcode: u8) -> InstructionKind {
    let destination = RegisterCode::from_bits(opcode >> 3);
    let source = RegisterCode::from_bits(opcode);
    match (destination.is_memory(), source.is_memory()) {
        (true, true) => InstructionKind::Illegal,
        (true, false) => InstructionKind::MoveToMemory { source },
        (false, true) => InstructionKind::MoveFromMemory { destination },
        (false, false) => InstructionKind::MoveRegister {
            destination,
            source,
        },
    }
}

/// Produces the canonical opcode byte for an instruction kind.  Where
/// the hardware has don't-care bits (the unconditional jump, call and
/// return), the canonical encoding zeroes them.
#[must_use]
pub fn encode(kind: &InstructionKind) -> u8 {
    match kind {
        InstructionKind::Halt => 0x00,
        InstructionKind::MoveRegister {
            destination,
            source,
        } => 0b1100_0000 | (destination.bits() << 3) | source.bits(),
        InstructionKind::MoveFromMemory { destination } => {
            0b1100_0111 | (destination.bits() << 3)
        }
        InstructionKind::MoveToMemory { source } => 0b1111_1000 | source.bits(),
        InstructionKind::MoveImmediate { destination } => 0b0000_0110 | (destination.bits() << 3),
        InstructionKind::MoveImmediateToMemory => 0b0011_1110,
        InstructionKind::AluRegister { function, source } => {
            0b1000_0000 | (function.bits() << 3) | source.bits()
        }
        InstructionKind::AluMemory { function } => 0b1000_0111 | (function.bits() << 3),
        InstructionKind::AluImmediate { function } => 0b0000_0100 | (function.bits() << 3),
        InstructionKind::Increment { register } => register.bits() << 3,
        InstructionKind::Decrement { register } => 0b0000_0001 | (register.bits() << 3),
        InstructionKind::Rotate { kind } => 0b0000_0010 | (kind.bits() << 3),
        InstructionKind::Jump { condition: None } => 0b0100_0100,
        InstructionKind::Jump {
            condition: Some(test),
        } => 0b0100_0000 | test.encode_bits(),
        InstructionKind::Call { condition: None } => 0b0100_0110,
        InstructionKind::Call {
            condition: Some(test),
        } => 0b0100_0010 | test.encode_bits(),
        InstructionKind::Return { condition: None } => 0b0000_0111,
        InstructionKind::Return {
            condition: Some(test),
        } => 0b0000_0011 | test.encode_bits(),
        InstructionKind::Restart { slot } => 0b0000_0101 | ((slot & 0b111) << 3),
        InstructionKind::Input { port } => 0b0100_0001 | ((port & 0b111) << 1),
        InstructionKind::Output { port } => 0b0100_0001 | ((port & 0b1_1111) << 1),
        InstructionKind::Undefined => 0b0011_1000,
        InstructionKind::Illegal => 0xff,
    }
}
