//! Control words for input and output.
//!
//! The second cycle of either instruction is an I/O command cycle:
//! the accumulator is presented where an address low byte would be,
//! and the raw instruction register where the tag and address high
//! bits would be (the I/O opcodes' top bits happen to equal the PCC
//! tag, which is how the real chip gets away with driving the
//! instruction verbatim — the port number rides in the middle bits
//! for the I/O controller to decode).  An input then tri-states for
//! the data transfer and latches the port's byte; an output drives
//! the accumulator a second time as write data and completes at T3.

use base::prelude::{DecodedInstruction, InstructionKind, RegisterCode};

use super::sequencer::{BusDrive, Capture, ControlWord, NextAction, RegisterWrite, WriteSource};
use super::timing::TimingState;

pub(super) fn control_word(
    instruction: &DecodedInstruction,
    _cycle_index: usize,
    state: TimingState,
) -> ControlWord {
    match instruction.kind() {
        InstructionKind::Input { .. } => match state {
            TimingState::DataTransfer => ControlWord {
                capture: Some(Capture::TempB),
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute1))
            },
            TimingState::Execute1 => {
                ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            }
            TimingState::Execute2 => ControlWord {
                write: Some(RegisterWrite {
                    destination: RegisterCode::A,
                    source: WriteSource::TempB,
                }),
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("input command cycle has no such state"),
        },
        InstructionKind::Output { .. } => match state {
            TimingState::DataTransfer => ControlWord {
                drive: BusDrive::Accumulator,
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("output command cycle has no such state"),
        },
        _ => unreachable!("not an I/O instruction"),
    }
}
