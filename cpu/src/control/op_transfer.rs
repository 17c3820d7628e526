//! Control words for the move family: register-to-register,
//! register-memory in both directions, and the immediate loads.
//!
//! The one-cycle register move spends T4 copying the source into
//! temporary B and T5 copying temporary B into the destination; the
//! memory and immediate forms stage the same temporary through an
//! extra read or write cycle.  A move to memory stages the source
//! register during the fetch cycle's execute states and then writes
//! it in a second, H:L-addressed cycle; the immediate store uses
//! three cycles (fetch, read the data byte at the program counter,
//! write it through H:L).

use base::prelude::{DecodedInstruction, InstructionKind};

use super::sequencer::{
    BusDrive, Capture, ControlWord, CycleAddress, NextAction, RegisterWrite, TempSource,
    WriteSource,
};
use super::timing::TimingState;
use crate::bus::CycleType;

pub(super) fn control_word(
    instruction: &DecodedInstruction,
    cycle_index: usize,
    state: TimingState,
) -> ControlWord {
    match instruction.kind() {
        InstructionKind::MoveRegister {
            destination,
            source,
        } => match state {
            TimingState::Execute1 => ControlWord {
                load_temp_b: Some(TempSource::Register(source)),
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            },
            TimingState::Execute2 => ControlWord {
                write: Some(RegisterWrite {
                    destination,
                    source: WriteSource::TempB,
                }),
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("register move has no second cycle"),
        },
        InstructionKind::MoveFromMemory { destination }
        | InstructionKind::MoveImmediate { destination } => match state {
            // Cycle 1 reads the operand byte (from H:L or from the
            // program counter; the sequencer's address table knows
            // which).
            TimingState::DataTransfer => ControlWord {
                capture: Some(Capture::TempB),
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute1))
            },
            TimingState::Execute1 => {
                ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            }
            TimingState::Execute2 => ControlWord {
                write: Some(RegisterWrite {
                    destination,
                    source: WriteSource::TempB,
                }),
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("move read cycle has no such state"),
        },
        InstructionKind::MoveToMemory { source } => match (cycle_index, state) {
            (0, TimingState::Execute1) => ControlWord {
                load_temp_b: Some(TempSource::Register(source)),
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            },
            (0, TimingState::Execute2) => ControlWord::idle(NextAction::NewCycle {
                cycle_type: CycleType::DataWrite,
                address: CycleAddress::Indirect,
            }),
            (1, TimingState::DataTransfer) => ControlWord {
                drive: BusDrive::TempB,
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("move-to-memory has no such state"),
        },
        InstructionKind::MoveImmediateToMemory => match (cycle_index, state) {
            (1, TimingState::DataTransfer) => ControlWord {
                capture: Some(Capture::TempB),
                ..ControlWord::idle(NextAction::NewCycle {
                    cycle_type: CycleType::DataWrite,
                    address: CycleAddress::Indirect,
                })
            },
            (2, TimingState::DataTransfer) => ControlWord {
                drive: BusDrive::TempB,
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("immediate store has no such state"),
        },
        _ => unreachable!("not a move instruction"),
    }
}
