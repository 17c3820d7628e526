//! Control words for the accumulator group: the eight ALU functions
//! against a register, memory or immediate operand, the register
//! increments and decrements, and the four rotates.
//!
//! Every form funnels its second operand into temporary B and retires
//! at a T5 commit.  Compare runs the ALU like subtract but requests
//! no register write, so only the flags change.  Increment and
//! decrement request the result-only flag update (zero, sign and
//! parity; never carry), and the rotates request the carry-only
//! update.

use base::prelude::{AluFunction, DecodedInstruction, InstructionKind, RegisterCode};

use super::sequencer::{
    Capture, ControlWord, FlagUpdate, NextAction, RegisterWrite, TempSource, WriteSource,
};
use super::timing::TimingState;

/// The T5 commit shared by all ALU operand forms.
fn alu_commit(function: AluFunction) -> ControlWord {
    let write = if function == AluFunction::Compare {
        None
    } else {
        Some(RegisterWrite {
            destination: RegisterCode::A,
            source: WriteSource::AluResult,
        })
    };
    ControlWord {
        alu: Some(function),
        write,
        flags: Some(FlagUpdate::Arithmetic),
        ..ControlWord::idle(NextAction::Complete)
    }
}

pub(super) fn control_word(
    instruction: &DecodedInstruction,
    _cycle_index: usize,
    state: TimingState,
) -> ControlWord {
    match instruction.kind() {
        InstructionKind::AluRegister { function, source } => match state {
            TimingState::Execute1 => ControlWord {
                load_temp_b: Some(TempSource::Register(source)),
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            },
            TimingState::Execute2 => alu_commit(function),
            _ => unreachable!("register-operand ALU op has no second cycle"),
        },
        InstructionKind::AluMemory { function } | InstructionKind::AluImmediate { function } => {
            match state {
                TimingState::DataTransfer => ControlWord {
                    capture: Some(Capture::TempB),
                    ..ControlWord::idle(NextAction::Advance(TimingState::Execute1))
                },
                TimingState::Execute1 => {
                    ControlWord::idle(NextAction::Advance(TimingState::Execute2))
                }
                TimingState::Execute2 => alu_commit(function),
                _ => unreachable!("ALU operand cycle has no such state"),
            }
        }
        InstructionKind::Increment { register } => match state {
            TimingState::Execute1 => ControlWord {
                load_temp_b: Some(TempSource::Register(register)),
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            },
            TimingState::Execute2 => ControlWord {
                write: Some(RegisterWrite {
                    destination: register,
                    source: WriteSource::IncrementTempB,
                }),
                flags: Some(FlagUpdate::Result),
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("increment has no second cycle"),
        },
        InstructionKind::Decrement { register } => match state {
            TimingState::Execute1 => ControlWord {
                load_temp_b: Some(TempSource::Register(register)),
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            },
            TimingState::Execute2 => ControlWord {
                write: Some(RegisterWrite {
                    destination: register,
                    source: WriteSource::DecrementTempB,
                }),
                flags: Some(FlagUpdate::Result),
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("decrement has no second cycle"),
        },
        InstructionKind::Rotate { kind } => match state {
            TimingState::Execute1 => {
                ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            }
            TimingState::Execute2 => ControlWord {
                write: Some(RegisterWrite {
                    destination: RegisterCode::A,
                    source: WriteSource::Rotate(kind),
                }),
                flags: Some(FlagUpdate::CarryOnly),
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("rotate has no second cycle"),
        },
        _ => unreachable!("not an accumulator-group instruction"),
    }
}
