//! The timing/bus state machine.
//!
//! [`Processor`] owns the whole core: the register file and address
//! stack, the instruction register and scratch temporaries, the
//! interrupt synchronizer and the timing state.  One call to
//! [`Processor::step`] advances the machine by exactly one primary
//! clock edge — one half of a timing state for the split states, one
//! whole WAIT or STOPPED state otherwise.  The setup half drives the
//! bus; the commit half latches data, applies the sequencer's control
//! word to the registers, stack and program counter, and chooses the
//! next state.
//!
//! The state machine itself knows nothing about instructions.  It
//! asks the sequencer for a control word and interprets it; the only
//! special cases wired in here are the ones the sequencer cannot see:
//! the instruction-register load at the fetch cycle's data transfer,
//! wait-request sampling at the T2 commit boundary, and the
//! suppression of bus drive and PC increment during an interrupt
//! acknowledge cycle.

use serde::Serialize;
use tracing::{event, Level};

use base::prelude::*;

use crate::alarm::Alarm;
use crate::alu;
use crate::bus::{BusInput, BusOutput, CycleType};
use crate::context::Context;
use crate::interrupt::InterruptSynchronizer;
use crate::regs::{Flags, RegisterFile};

mod op_alu;
mod op_flow;
mod op_io;
mod op_transfer;
mod sequencer;
pub mod timing;

#[cfg(test)]
mod tests;

use sequencer::{
    BusDrive, Capture, ControlWord, CycleAddress, FlagUpdate, NextAction, TempSource, WriteSource,
};
use timing::{Phase, TimingState};

/// The processor core.  Created in the stopped state, exactly like
/// the chip at power-on; the first interrupt starts execution through
/// an acknowledge cycle.
#[derive(Debug)]
pub struct Processor {
    regs: RegisterFile,
    /// The decoded instruction register.  Starts out as a decoded
    /// halt, which is consistent with the machine being stopped.
    instruction: DecodedInstruction,
    temp_a: u8,
    temp_b: u8,
    state: TimingState,
    phase: Phase,
    cycle_index: usize,
    cycle_type: CycleType,
    cycle_source: CycleAddress,
    /// Address latched at the start of the current machine cycle and
    /// held stable across its states (the program counter may
    /// increment underneath it at T2).
    address_latch: Address,
    in_acknowledge: bool,
    sync: bool,
    interrupt: InterruptSynchronizer,
}

impl Processor {
    #[must_use]
    pub fn new() -> Processor {
        Processor {
            regs: RegisterFile::new(),
            instruction: decode(0x00),
            temp_a: 0,
            temp_b: 0,
            state: TimingState::Halted,
            phase: Phase::Setup,
            cycle_index: 0,
            cycle_type: CycleType::InstructionFetch,
            cycle_source: CycleAddress::ProgramCounter,
            address_latch: Address::ZERO,
            in_acknowledge: false,
            sync: false,
            interrupt: InterruptSynchronizer::new(),
        }
    }

    /// Returns the machine to its power-on state.
    pub fn reset(&mut self) {
        *self = Processor::new();
    }

    /// Advances the machine by one primary clock edge.
    pub fn step(&mut self, ctx: &Context, input: &BusInput) -> Result<BusOutput, Alarm> {
        self.interrupt.sample(input.interrupt_request);
        self.sync = !self.sync;
        match self.state {
            TimingState::Halted => {
                let output = self.output(None);
                if self.interrupt.pending() {
                    event!(
                        Level::INFO,
                        simulated_time = ?ctx.simulated_time,
                        "interrupt releases the stopped machine"
                    );
                    self.begin_instruction();
                }
                Ok(output)
            }
            TimingState::Wait => {
                let output = self.output(None);
                if !input.wait_request {
                    self.state = TimingState::DataTransfer;
                    self.phase = Phase::Setup;
                }
                Ok(output)
            }
            _ => self.step_split(ctx, input),
        }
    }

    fn step_split(&mut self, ctx: &Context, input: &BusInput) -> Result<BusOutput, Alarm> {
        if self.phase == Phase::Setup
            && matches!(
                self.state,
                TimingState::AddressLow | TimingState::Acknowledge
            )
        {
            self.address_latch = self.current_cycle_address();
        }
        let word = self.current_control_word();
        let driven = self.drive_byte(&word);
        if let (Some(ours), Some(theirs)) = (driven, input.data) {
            return Err(Alarm::BusConflict {
                state: self.state,
                processor_byte: ours,
                external_byte: theirs,
            });
        }
        // The output reflects the state this step belongs to, so it
        // is built before the commit half moves the machine on.
        let output = self.output(driven);
        match self.phase {
            Phase::Setup => {
                self.phase = Phase::Commit;
            }
            Phase::Commit => {
                let next = self.apply(&word, input, ctx)?;
                self.advance(next, input, ctx);
                self.phase = Phase::Setup;
            }
        }
        Ok(output)
    }

    fn output(&self, data: Option<u8>) -> BusOutput {
        BusOutput {
            data,
            state_code: self.state.code(),
            sync: self.sync,
        }
    }

    fn current_cycle_address(&self) -> Address {
        match self.cycle_source {
            CycleAddress::ProgramCounter => self.regs.pc(),
            CycleAddress::Indirect => self.regs.indirect_address(),
            CycleAddress::Io => Address::ZERO,
        }
    }

    fn current_control_word(&self) -> ControlWord {
        if self.state == TimingState::DataTransfer && self.cycle_index == 0 {
            sequencer::fetch_word()
        } else {
            sequencer::control_word(
                &self.instruction,
                self.cycle_index,
                self.state,
                &self.regs.flags,
            )
        }
    }

    fn drive_byte(&self, word: &ControlWord) -> Option<u8> {
        // During an acknowledge cycle the processor tri-states both
        // address states; the external interrupt source owns the bus.
        if self.in_acknowledge
            && matches!(
                self.state,
                TimingState::Acknowledge | TimingState::AddressHigh
            )
        {
            return None;
        }
        match word.drive {
            BusDrive::None => None,
            BusDrive::AddressLow => Some(self.address_latch.low()),
            BusDrive::AddressHigh => {
                Some((self.cycle_type.tag() << 6) | self.address_latch.high())
            }
            BusDrive::Accumulator => Some(self.regs.get(RegisterCode::A)),
            BusDrive::TempB => Some(self.temp_b),
            BusDrive::Instruction => Some(self.instruction.opcode()),
        }
    }

    /// Applies one commit half-step's control word.  Ordering matters
    /// and models the hardware data paths: the ALU reads its operands
    /// first, then bus captures and temporary loads, then stack
    /// pointer motion, then program-counter updates (which may read
    /// the just-loaded temporaries), and finally the register write
    /// and flag update.
    fn apply(
        &mut self,
        word: &ControlWord,
        input: &BusInput,
        ctx: &Context,
    ) -> Result<NextAction, Alarm> {
        let mut next = word.next;

        let alu_out = word.alu.map(|function| {
            alu::evaluate(
                function,
                self.regs.get(RegisterCode::A),
                self.temp_b,
                self.regs.flags.carry,
            )
        });

        if let Some(capture) = word.capture {
            let byte = match input.data {
                Some(byte) => byte,
                None => {
                    return Err(Alarm::BusUndriven {
                        cycle_type: self.cycle_type,
                        address: self.address_latch,
                    });
                }
            };
            match capture {
                Capture::Instruction => {
                    next = self.load_instruction(byte, ctx)?;
                }
                Capture::TempA => self.temp_a = byte,
                Capture::TempB => self.temp_b = byte,
            }
        }

        if let Some(source) = word.load_temp_a {
            self.temp_a = self.temp_source(source);
        }
        if let Some(source) = word.load_temp_b {
            self.temp_b = self.temp_source(source);
        }

        if word.stack_push {
            self.regs.push();
        }
        if word.stack_pop {
            self.regs.pop();
        }

        if word.increment_pc && !self.in_acknowledge {
            self.regs.increment_pc();
        }
        if word.load_pc_high {
            self.regs.set_pc_high(self.temp_a);
        }
        if word.load_pc_low {
            self.regs.set_pc_low(self.temp_b);
        }

        let mut written = None;
        let mut rotate_out = None;
        if let Some(write) = word.write {
            let value = match write.source {
                WriteSource::TempB => self.temp_b,
                WriteSource::AluResult => match alu_out {
                    Some(out) => out.value,
                    None => unreachable!("ALU result written without an ALU request"),
                },
                WriteSource::IncrementTempB => self.temp_b.wrapping_add(1),
                WriteSource::DecrementTempB => self.temp_b.wrapping_sub(1),
                WriteSource::Rotate(kind) => {
                    let out = alu::rotate(
                        kind,
                        self.regs.get(RegisterCode::A),
                        self.regs.flags.carry,
                    );
                    rotate_out = Some(out);
                    out.value
                }
            };
            self.regs.set(write.destination, value);
            written = Some(value);
        }

        if let Some(update) = word.flags {
            match update {
                FlagUpdate::Arithmetic => match alu_out {
                    Some(out) => {
                        self.regs.flags.carry = out.carry;
                        self.regs.flags.set_result(out.value);
                    }
                    None => unreachable!("arithmetic flag update without an ALU request"),
                },
                FlagUpdate::Result => match written {
                    Some(value) => self.regs.flags.set_result(value),
                    None => unreachable!("result flag update without a register write"),
                },
                FlagUpdate::CarryOnly => match rotate_out {
                    Some(out) => self.regs.flags.carry = out.carry,
                    None => unreachable!("carry flag update without a rotate"),
                },
            }
        }

        Ok(next)
    }

    fn temp_source(&self, source: TempSource) -> u8 {
        match source {
            TempSource::Register(code) => self.regs.get(code),
            TempSource::Zero => 0,
            TempSource::RestartTarget => match self.instruction.kind() {
                InstructionKind::Restart { slot } => Address::restart_vector(slot).low(),
                _ => unreachable!("restart target requested by a non-restart instruction"),
            },
        }
    }

    /// Latches and decodes a fetched (or injected) instruction byte,
    /// and decides how the instruction continues.  This is also the
    /// point at which an acknowledge cycle clears the interrupt
    /// latch.
    fn load_instruction(&mut self, byte: u8, ctx: &Context) -> Result<NextAction, Alarm> {
        self.instruction = decode(byte);
        if self.in_acknowledge {
            self.interrupt.acknowledge();
            self.in_acknowledge = false;
            event!(
                Level::DEBUG,
                instruction = %self.instruction,
                "acknowledge cycle captured the injected instruction"
            );
        }
        match self.instruction.kind() {
            InstructionKind::Illegal => {
                return Err(Alarm::IllegalInstruction {
                    opcode: byte,
                    address: self.regs.pc(),
                });
            }
            InstructionKind::Undefined => {
                event!(
                    Level::WARN,
                    simulated_time = ?ctx.simulated_time,
                    "undefined opcode {byte:#04x} at {}; executing as a no-op",
                    self.regs.pc()
                );
            }
            _ => {}
        }
        Ok(sequencer::after_fetch(&self.instruction, &self.regs.flags))
    }

    fn advance(&mut self, next: NextAction, input: &BusInput, ctx: &Context) {
        match next {
            NextAction::Advance(state) => {
                // The wait-request line is sampled only at the
                // address-high to data-transfer boundary.
                if self.state == TimingState::AddressHigh
                    && state == TimingState::DataTransfer
                    && input.wait_request
                {
                    event!(Level::DEBUG, "wait requested; inserting wait states");
                    self.state = TimingState::Wait;
                } else {
                    self.state = state;
                }
            }
            NextAction::NewCycle {
                cycle_type,
                address,
            } => {
                self.cycle_index += 1;
                self.cycle_type = cycle_type;
                self.cycle_source = address;
                self.state = TimingState::AddressLow;
            }
            NextAction::Complete => {
                event!(
                    Level::TRACE,
                    instruction = %self.instruction,
                    pc = %self.regs.pc(),
                    simulated_time = ?ctx.simulated_time,
                    "instruction retired"
                );
                self.begin_instruction();
            }
            NextAction::Stop => {
                event!(
                    Level::INFO,
                    simulated_time = ?ctx.simulated_time,
                    "halt: machine stopped"
                );
                self.cycle_index = 0;
                self.state = TimingState::Halted;
            }
        }
    }

    /// Starts the next instruction: a fetch cycle, or an acknowledge
    /// cycle when the interrupt latch is set.  This is the only place
    /// the latch is consulted, which is what guarantees acknowledge
    /// cycles begin only at instruction boundaries.
    fn begin_instruction(&mut self) {
        self.cycle_index = 0;
        self.cycle_type = CycleType::InstructionFetch;
        self.cycle_source = CycleAddress::ProgramCounter;
        self.phase = Phase::Setup;
        if self.interrupt.pending() {
            event!(Level::DEBUG, "entering interrupt acknowledge cycle");
            self.in_acknowledge = true;
            self.state = TimingState::Acknowledge;
        } else {
            self.in_acknowledge = false;
            self.state = TimingState::AddressLow;
        }
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.state == TimingState::Halted
    }

    /// A read-only snapshot of the machine for debugging and
    /// front-panel display.  Taking one has no side effects.
    #[must_use]
    pub fn status(&self) -> ProcessorStatus {
        ProcessorStatus {
            a: self.regs.get(RegisterCode::A),
            b: self.regs.get(RegisterCode::B),
            c: self.regs.get(RegisterCode::C),
            d: self.regs.get(RegisterCode::D),
            e: self.regs.get(RegisterCode::E),
            h: self.regs.get(RegisterCode::H),
            l: self.regs.get(RegisterCode::L),
            flags: self.regs.flags,
            pc: self.regs.pc(),
            stack: self.regs.stack(),
            stack_pointer: self.regs.pointer(),
            state: self.state,
            cycle_index: self.cycle_index,
            instruction: self.instruction.to_string(),
        }
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

/// A side-effect-free snapshot of the processor's observable state.
#[derive(Clone, Debug, Serialize)]
pub struct ProcessorStatus {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub flags: Flags,
    pub pc: Address,
    pub stack: [Address; 8],
    pub stack_pointer: u8,
    pub state: TimingState,
    pub cycle_index: usize,
    pub instruction: String,
}
