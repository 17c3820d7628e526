//! The microcode sequencer.
//!
//! For every (instruction kind, machine-cycle index, timing state)
//! combination the sequencer produces a [`ControlWord`]: a plain
//! value describing every side effect of that state — what the
//! processor drives on the bus, what it latches from the bus, which
//! internal transfers and register writes happen at the commit
//! half-step, and what the machine does next.  The timing state
//! machine in `control/mod.rs` only interprets control words; all
//! per-instruction knowledge lives here and in the `op_*` modules,
//! one per instruction family.
//!
//! Two points are handled by the state machine rather than the
//! tables, because the information is simply not available here:
//!
//! - the data-transfer state of cycle 0 is the instruction fetch, and
//!   until its commit half-step latches the instruction register the
//!   current instruction is still the previous one.  The state
//!   machine applies a fixed fetch word and then asks
//!   [`after_fetch`] how the freshly decoded instruction continues;
//! - wait-request sampling at the T2 commit boundary, and the
//!   suppression of bus drive and PC increment during an acknowledge
//!   cycle.

use base::prelude::{AluFunction, DecodedInstruction, InstructionKind, RegisterCode, RotateKind};

use super::timing::TimingState;
use crate::bus::CycleType;
use crate::regs::Flags;

use super::{op_alu, op_flow, op_io, op_transfer};

/// What the processor drives on the bus during a state.  `None`
/// means tri-stated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BusDrive {
    None,
    /// The low byte of the cycle's address latch.
    AddressLow,
    /// The cycle-type tag above the high address bits.
    AddressHigh,
    /// The accumulator (I/O cycles and output data transfers).
    Accumulator,
    /// The low scratch temporary (memory write data).
    TempB,
    /// The raw instruction register (the second state of an I/O
    /// cycle; the I/O opcodes' top bits coincide with the PCC tag).
    Instruction,
}

/// Where a byte captured from the data bus goes at commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Capture {
    Instruction,
    TempA,
    TempB,
}

/// Source selector for an internal scratch-temporary load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TempSource {
    /// A physical register (never the memory pseudo-register).
    Register(RegisterCode),
    Zero,
    /// The low byte of the restart instruction's fixed target.
    RestartTarget,
}

/// Source selector for a register write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WriteSource {
    TempB,
    AluResult,
    IncrementTempB,
    DecrementTempB,
    Rotate(RotateKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RegisterWrite {
    pub destination: RegisterCode,
    pub source: WriteSource,
}

/// Which flags a state updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FlagUpdate {
    /// Carry, zero, sign and parity, from the ALU output.
    Arithmetic,
    /// Zero, sign and parity from the written value; carry untouched
    /// (increment/decrement).
    Result,
    /// Carry only (rotates).
    CarryOnly,
}

/// Where the next machine cycle's address comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CycleAddress {
    ProgramCounter,
    /// The H:L indirect address.
    Indirect,
    /// I/O command cycles present the accumulator and the instruction
    /// register instead of an address.
    Io,
}

/// What happens after a state's commit half-step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NextAction {
    /// Continue to another state of the same machine cycle.
    Advance(TimingState),
    /// Begin the next machine cycle of the same instruction.
    NewCycle {
        cycle_type: CycleType,
        address: CycleAddress,
    },
    /// The instruction retires; the next cycle fetches (or
    /// acknowledges an interrupt).
    Complete,
    /// Enter the stopped state.
    Stop,
}

/// One state's worth of control signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ControlWord {
    pub drive: BusDrive,
    pub capture: Option<Capture>,
    pub load_temp_a: Option<TempSource>,
    pub load_temp_b: Option<TempSource>,
    /// Advance the program counter at commit.  Only ever set in T2,
    /// and only for cycles addressed by the program counter.
    pub increment_pc: bool,
    /// Load the high program-counter byte from temporary A.
    pub load_pc_high: bool,
    /// Load the low program-counter byte from temporary B.
    pub load_pc_low: bool,
    pub stack_push: bool,
    pub stack_pop: bool,
    /// Run the ALU over (accumulator, temporary B, carry).
    pub alu: Option<AluFunction>,
    pub write: Option<RegisterWrite>,
    pub flags: Option<FlagUpdate>,
    pub next: NextAction,
}

impl ControlWord {
    /// A word with no effects which proceeds to `next`.
    pub(crate) fn idle(next: NextAction) -> ControlWord {
        ControlWord {
            drive: BusDrive::None,
            capture: None,
            load_temp_a: None,
            load_temp_b: None,
            increment_pc: false,
            load_pc_high: false,
            load_pc_low: false,
            stack_push: false,
            stack_pop: false,
            alu: None,
            write: None,
            flags: None,
            next,
        }
    }
}

/// The fixed control word for the data-transfer state of cycle 0:
/// latch the instruction register from the bus.  Its `next` field is
/// a placeholder; the state machine replaces it with
/// [`after_fetch`]'s answer once the new instruction is decoded.
pub(crate) fn fetch_word() -> ControlWord {
    ControlWord {
        capture: Some(Capture::Instruction),
        ..ControlWord::idle(NextAction::Complete)
    }
}

/// How a freshly fetched instruction continues after the fetch
/// cycle's data-transfer state.
pub(crate) fn after_fetch(instruction: &DecodedInstruction, flags: &Flags) -> NextAction {
    match instruction.kind() {
        InstructionKind::Halt => NextAction::Stop,
        // Undefined patterns execute as a one-cycle no-op; the
        // decode-time diagnostic has already been issued.  The
        // illegal pattern never reaches this point (the state
        // machine raises an alarm at decode).
        InstructionKind::Undefined | InstructionKind::Illegal => NextAction::Complete,
        InstructionKind::MoveRegister { .. }
        | InstructionKind::MoveToMemory { .. }
        | InstructionKind::AluRegister { .. }
        | InstructionKind::Increment { .. }
        | InstructionKind::Decrement { .. }
        | InstructionKind::Rotate { .. }
        | InstructionKind::Restart { .. } => NextAction::Advance(TimingState::Execute1),
        InstructionKind::MoveFromMemory { .. } | InstructionKind::AluMemory { .. } => {
            NextAction::NewCycle {
                cycle_type: CycleType::DataRead,
                address: CycleAddress::Indirect,
            }
        }
        InstructionKind::MoveImmediate { .. }
        | InstructionKind::MoveImmediateToMemory
        | InstructionKind::AluImmediate { .. }
        | InstructionKind::Jump { .. }
        | InstructionKind::Call { .. } => NextAction::NewCycle {
            cycle_type: CycleType::DataRead,
            address: CycleAddress::ProgramCounter,
        },
        InstructionKind::Return { condition } => {
            let taken = condition.map_or(true, |test| flags.test(&test));
            if taken {
                NextAction::Advance(TimingState::Execute1)
            } else {
                NextAction::Complete
            }
        }
        InstructionKind::Input { .. } | InstructionKind::Output { .. } => NextAction::NewCycle {
            cycle_type: CycleType::Io,
            address: CycleAddress::Io,
        },
    }
}

/// The address source of a machine cycle.  Cycle 0 is always the
/// instruction fetch, addressed by the program counter.
pub(crate) fn cycle_address(instruction: &DecodedInstruction, cycle_index: usize) -> CycleAddress {
    if cycle_index == 0 {
        return CycleAddress::ProgramCounter;
    }
    match instruction.kind() {
        InstructionKind::MoveFromMemory { .. }
        | InstructionKind::MoveToMemory { .. }
        | InstructionKind::AluMemory { .. } => CycleAddress::Indirect,
        // The second cycle of a move-immediate-to-memory reads the
        // data byte at the program counter; the third writes it
        // through H:L.
        InstructionKind::MoveImmediateToMemory => {
            if cycle_index == 1 {
                CycleAddress::ProgramCounter
            } else {
                CycleAddress::Indirect
            }
        }
        InstructionKind::Input { .. } | InstructionKind::Output { .. } => CycleAddress::Io,
        _ => CycleAddress::ProgramCounter,
    }
}

/// The control word for one (instruction, cycle, state).  The
/// data-transfer state of cycle 0 must not be looked up here; the
/// state machine uses [`fetch_word`] and [`after_fetch`] for it.
pub(crate) fn control_word(
    instruction: &DecodedInstruction,
    cycle_index: usize,
    state: TimingState,
    flags: &Flags,
) -> ControlWord {
    match state {
        TimingState::AddressLow | TimingState::Acknowledge => {
            address_low_word(instruction, cycle_index)
        }
        TimingState::AddressHigh => address_high_word(instruction, cycle_index),
        // WAIT repeats until released; the released state re-enters
        // the data transfer.  STOPPED never consults the sequencer.
        TimingState::Wait | TimingState::Halted => {
            ControlWord::idle(NextAction::Advance(TimingState::DataTransfer))
        }
        TimingState::DataTransfer | TimingState::Execute1 | TimingState::Execute2 => {
            debug_assert!(
                cycle_index > 0 || state != TimingState::DataTransfer,
                "cycle-0 data transfer is the fetch; handled by the state machine"
            );
            execute_word(instruction, cycle_index, state, flags)
        }
    }
}

fn address_low_word(instruction: &DecodedInstruction, cycle_index: usize) -> ControlWord {
    let drive = match cycle_address(instruction, cycle_index) {
        CycleAddress::Io => BusDrive::Accumulator,
        _ => BusDrive::AddressLow,
    };
    ControlWord {
        drive,
        ..ControlWord::idle(NextAction::Advance(TimingState::AddressHigh))
    }
}

fn address_high_word(instruction: &DecodedInstruction, cycle_index: usize) -> ControlWord {
    let address = cycle_address(instruction, cycle_index);
    let drive = match address {
        CycleAddress::Io => BusDrive::Instruction,
        _ => BusDrive::AddressHigh,
    };
    ControlWord {
        drive,
        increment_pc: address == CycleAddress::ProgramCounter,
        ..ControlWord::idle(NextAction::Advance(TimingState::DataTransfer))
    }
}

fn execute_word(
    instruction: &DecodedInstruction,
    cycle_index: usize,
    state: TimingState,
    flags: &Flags,
) -> ControlWord {
    match instruction.kind() {
        InstructionKind::MoveRegister { .. }
        | InstructionKind::MoveFromMemory { .. }
        | InstructionKind::MoveToMemory { .. }
        | InstructionKind::MoveImmediate { .. }
        | InstructionKind::MoveImmediateToMemory => {
            op_transfer::control_word(instruction, cycle_index, state)
        }
        InstructionKind::AluRegister { .. }
        | InstructionKind::AluMemory { .. }
        | InstructionKind::AluImmediate { .. }
        | InstructionKind::Increment { .. }
        | InstructionKind::Decrement { .. }
        | InstructionKind::Rotate { .. } => op_alu::control_word(instruction, cycle_index, state),
        InstructionKind::Jump { .. }
        | InstructionKind::Call { .. }
        | InstructionKind::Return { .. }
        | InstructionKind::Restart { .. } => {
            op_flow::control_word(instruction, cycle_index, state, flags)
        }
        InstructionKind::Input { .. } | InstructionKind::Output { .. } => {
            op_io::control_word(instruction, cycle_index, state)
        }
        // Halt, undefined and illegal instructions never have
        // post-fetch states.
        InstructionKind::Halt | InstructionKind::Undefined | InstructionKind::Illegal => {
            unreachable!("single-cycle instruction has no execute states")
        }
    }
}
