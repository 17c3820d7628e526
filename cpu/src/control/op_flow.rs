//! Control words for the flow-control family: jumps, calls, returns
//! and the one-byte restarts.
//!
//! Jumps and calls read their target address low byte in cycle 1 and
//! high byte in cycle 2, both at the program counter.  The condition
//! is evaluated at the very commit which captures the high byte: if
//! it fails, the instruction completes there — the address bytes have
//! been consumed (the bus protocol requires it) and the incremented
//! program counter already points past them.  If it holds, T4 and T5
//! move the staged bytes into the program counter; a call also
//! advances the stack pointer first, so the target lands in a fresh
//! slot and the return address survives in the old one.
//!
//! A return is a single cycle: the decision was made at the fetch
//! commit (see `after_fetch`), and a taken return merely steps the
//! stack pointer back during T4.
//!
//! Restart is the one-byte call: T4 stages zero and the fixed vector
//! into the temporaries and pushes; T5 loads both program-counter
//! bytes from them.

use base::prelude::{DecodedInstruction, InstructionKind};

use super::sequencer::{Capture, ControlWord, CycleAddress, NextAction, TempSource};
use super::timing::TimingState;
use crate::bus::CycleType;
use crate::regs::Flags;

pub(super) fn control_word(
    instruction: &DecodedInstruction,
    cycle_index: usize,
    state: TimingState,
    flags: &Flags,
) -> ControlWord {
    match instruction.kind() {
        InstructionKind::Jump { condition } => match (cycle_index, state) {
            (1, TimingState::DataTransfer) => ControlWord {
                capture: Some(Capture::TempB),
                ..ControlWord::idle(NextAction::NewCycle {
                    cycle_type: CycleType::DataRead,
                    address: CycleAddress::ProgramCounter,
                })
            },
            (2, TimingState::DataTransfer) => {
                let taken = condition.map_or(true, |test| flags.test(&test));
                ControlWord {
                    capture: Some(Capture::TempA),
                    ..ControlWord::idle(if taken {
                        NextAction::Advance(TimingState::Execute1)
                    } else {
                        NextAction::Complete
                    })
                }
            }
            (2, TimingState::Execute1) => ControlWord {
                load_pc_high: true,
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            },
            (2, TimingState::Execute2) => ControlWord {
                load_pc_low: true,
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("jump has no such state"),
        },
        InstructionKind::Call { condition } => match (cycle_index, state) {
            (1, TimingState::DataTransfer) => ControlWord {
                capture: Some(Capture::TempB),
                ..ControlWord::idle(NextAction::NewCycle {
                    cycle_type: CycleType::DataRead,
                    address: CycleAddress::ProgramCounter,
                })
            },
            (2, TimingState::DataTransfer) => {
                let taken = condition.map_or(true, |test| flags.test(&test));
                ControlWord {
                    capture: Some(Capture::TempA),
                    ..ControlWord::idle(if taken {
                        NextAction::Advance(TimingState::Execute1)
                    } else {
                        NextAction::Complete
                    })
                }
            }
            // The push happens before the program-counter loads, so
            // the return address stays behind in the old slot.
            (2, TimingState::Execute1) => ControlWord {
                stack_push: true,
                load_pc_high: true,
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            },
            (2, TimingState::Execute2) => ControlWord {
                load_pc_low: true,
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("call has no such state"),
        },
        InstructionKind::Return { .. } => match state {
            TimingState::Execute1 => ControlWord {
                stack_pop: true,
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            },
            TimingState::Execute2 => ControlWord::idle(NextAction::Complete),
            _ => unreachable!("return has no second cycle"),
        },
        InstructionKind::Restart { .. } => match state {
            TimingState::Execute1 => ControlWord {
                load_temp_a: Some(TempSource::Zero),
                load_temp_b: Some(TempSource::RestartTarget),
                stack_push: true,
                ..ControlWord::idle(NextAction::Advance(TimingState::Execute2))
            },
            TimingState::Execute2 => ControlWord {
                load_pc_high: true,
                load_pc_low: true,
                ..ControlWord::idle(NextAction::Complete)
            },
            _ => unreachable!("restart has no second cycle"),
        },
        _ => unreachable!("not a flow-control instruction"),
    }
}
