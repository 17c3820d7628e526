//! Symbolic (mnemonic) formatting of decoded instructions, using the
//! abbreviations from the original hardware documentation: `LAB` is
//! the move B into A, `LAM` loads A from memory, `ADI` is
//! add-immediate, and the conditional flow mnemonics spell the sense
//! and flag letters out (`JTC` jumps when Carry is true, `RFZ`
//! returns when Zero is false).

use std::fmt::{self, Display, Formatter};

use super::{
    AluFunction, Condition, ConditionTest, DecodedInstruction, InstructionKind, RegisterCode,
    RotateKind,
};

impl Display for RegisterCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            RegisterCode::A => "A",
            RegisterCode::B => "B",
            RegisterCode::C => "C",
            RegisterCode::D => "D",
            RegisterCode::E => "E",
            RegisterCode::H => "H",
            RegisterCode::L => "L",
            RegisterCode::M => "M",
        })
    }
}

impl Condition {
    fn letter(&self) -> char {
        match self {
            Condition::Carry => 'C',
            Condition::Zero => 'Z',
            Condition::Sign => 'S',
            Condition::Parity => 'P',
        }
    }
}

impl ConditionTest {
    fn suffix(&self) -> String {
        format!(
            "{}{}",
            if self.sense { 'T' } else { 'F' },
            self.flag.letter()
        )
    }
}

impl AluFunction {
    /// The two-letter stem of the register-operand mnemonic; the
    /// immediate form appends `I`.
    fn stem(&self) -> &'static str {
        match self {
            AluFunction::Add => "AD",
            AluFunction::AddWithCarry => "AC",
            AluFunction::Subtract => "SU",
            AluFunction::SubtractWithBorrow => "SB",
            AluFunction::And => "ND",
            AluFunction::Xor => "XR",
            AluFunction::Or => "OR",
            AluFunction::Compare => "CP",
        }
    }
}

impl Display for DecodedInstruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self.kind() {
            InstructionKind::Halt => write!(f, "HLT"),
            InstructionKind::MoveRegister {
                destination,
                source,
            } => write!(f, "L{destination}{source}"),
            InstructionKind::MoveFromMemory { destination } => write!(f, "L{destination}M"),
            InstructionKind::MoveToMemory { source } => write!(f, "LM{source}"),
            InstructionKind::MoveImmediate { destination } => write!(f, "L{destination}I"),
            InstructionKind::MoveImmediateToMemory => write!(f, "LMI"),
            InstructionKind::AluRegister { function, source } => {
                write!(f, "{}{source}", function.stem())
            }
            InstructionKind::AluMemory { function } => write!(f, "{}M", function.stem()),
            InstructionKind::AluImmediate { function } => write!(f, "{}I", function.stem()),
            InstructionKind::Increment { register } => write!(f, "IN{register}"),
            InstructionKind::Decrement { register } => write!(f, "DC{register}"),
            InstructionKind::Rotate { kind } => f.write_str(match kind {
                RotateKind::LeftCircular => "RLC",
                RotateKind::RightCircular => "RRC",
                RotateKind::LeftThroughCarry => "RAL",
                RotateKind::RightThroughCarry => "RAR",
            }),
            InstructionKind::Jump { condition: None } => write!(f, "JMP"),
            InstructionKind::Jump {
                condition: Some(test),
            } => write!(f, "J{}", test.suffix()),
            InstructionKind::Call { condition: None } => write!(f, "CAL"),
            InstructionKind::Call {
                condition: Some(test),
            } => write!(f, "C{}", test.suffix()),
            InstructionKind::Return { condition: None } => write!(f, "RET"),
            InstructionKind::Return {
                condition: Some(test),
            } => write!(f, "R{}", test.suffix()),
            InstructionKind::Restart { slot } => write!(f, "RST {slot}"),
            InstructionKind::Input { port } => write!(f, "INP {port}"),
            InstructionKind::Output { port } => write!(f, "OUT {port}"),
            InstructionKind::Undefined => {
                write!(f, "(undefined {:#04x})", self.opcode())
            }
            InstructionKind::Illegal => {
                write!(f, "(illegal {:#04x})", self.opcode())
            }
        }
    }
}
