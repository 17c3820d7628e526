//! Wires the processor core to its bus collaborators.
//!
//! The machine owns the processor, the RAM, the console and the
//! power-on logic, and plays the part of the board's address-decode
//! and I/O-controller glue: it follows the processor using only the
//! state codes on the bus (latching the address from the two
//! address-output states, the cycle type from the tag bits) and
//! decides on each half-step what, if anything, drives the data
//! lines.
//!
//! Power-on works the way the real chip demands: the processor wakes
//! up stopped, the panel holds the interrupt line high, and when the
//! acknowledge cycle's data transfer arrives the panel jams a restart
//! instruction onto the bus.  Execution then begins at the chosen
//! restart vector.

use std::time::Duration;

use tracing::{event, Level};

use base::prelude::*;
use cpu::{
    Alarm, BasicClock, BusInput, BusOutput, Clock, Context, CycleType, Processor,
    ProcessorStatus, HALF_STATE_PERIOD,
};

use crate::console::Console;
use crate::memory::Memory;
use crate::sleep::MinimalSleeper;

const T1_CODE: u8 = 0b010;
const T1I_CODE: u8 = 0b110;
const T2_CODE: u8 = 0b100;
const T3_CODE: u8 = 0b001;
const STOPPED_CODE: u8 = 0b011;

/// Why a run stopped.
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The program executed a halt.
    Halted,
    /// The state limit given on the command line was reached.
    StepLimit,
}

pub struct Machine {
    cpu: Processor,
    memory: Memory,
    console: Console,
    clock: BasicClock,

    // Bus-follower state, reconstructed from the processor's outputs
    // exactly as external hardware would.
    address_low: u8,
    address_high: u8,
    t2_byte: u8,
    cycle_type: CycleType,
    address_valid: bool,
    expect_injection: bool,
    t3_run: usize,

    // Front-panel start logic.
    interrupt_line: bool,
    restart_opcode: u8,
    started: bool,
}

impl Machine {
    #[must_use]
    pub fn new(memory: Memory, console: Console, restart_vector: u8) -> Machine {
        Machine {
            cpu: Processor::new(),
            memory,
            console,
            clock: BasicClock::new(),
            address_low: 0,
            address_high: 0,
            t2_byte: 0,
            cycle_type: CycleType::InstructionFetch,
            address_valid: false,
            expect_injection: false,
            t3_run: 0,
            // Hold the start button down until the restart gets
            // jammed in.
            interrupt_line: true,
            restart_opcode: encode(&InstructionKind::Restart {
                slot: restart_vector & 0b111,
            }),
            started: false,
        }
    }

    /// Runs until the program halts, an alarm fires, or the optional
    /// state limit runs out.
    pub fn run(
        &mut self,
        max_states: Option<u64>,
        speed_multiplier: Option<f64>,
    ) -> Result<RunOutcome, Alarm> {
        let mut sleeper = MinimalSleeper::new(Duration::from_millis(2));
        let mut half_steps: u64 = 0;
        loop {
            let input = self.input();
            let ctx = Context::new(self.clock.now(), Duration::ZERO);
            let output = self.cpu.step(&ctx, &input)?;
            self.observe(&output);
            self.clock.consume(&HALF_STATE_PERIOD);
            if let Some(multiplier) = speed_multiplier {
                sleeper.sleep(HALF_STATE_PERIOD.mul_f64(multiplier));
            }
            half_steps += 1;
            if self.started && output.state_code == STOPPED_CODE {
                event!(
                    Level::INFO,
                    simulated_time = ?self.clock.now(),
                    "program halted after {half_steps} half-steps"
                );
                return Ok(RunOutcome::Halted);
            }
            if let Some(limit) = max_states {
                // Two half-steps per state.
                if half_steps >= limit.saturating_mul(2) {
                    return Ok(RunOutcome::StepLimit);
                }
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> ProcessorStatus {
        self.cpu.status()
    }

    fn input(&mut self) -> BusInput {
        BusInput {
            data: self.drive(),
            wait_request: false,
            interrupt_request: self.interrupt_line,
        }
    }

    /// What drives the data bus for the coming half-step: only ever
    /// the commit half of a data transfer, which is the half-step
    /// right after the first T3 output of a cycle.
    fn drive(&mut self) -> Option<u8> {
        if self.t3_run != 1 {
            return None;
        }
        if self.expect_injection {
            // The panel's restart goes in; the start button comes up.
            self.interrupt_line = false;
            return Some(self.restart_opcode);
        }
        if !self.address_valid {
            return None;
        }
        match self.cycle_type {
            CycleType::InstructionFetch | CycleType::DataRead => {
                Some(self.memory.get(self.address()))
            }
            CycleType::Io => {
                let port = (self.t2_byte >> 1) & 0b1_1111;
                if port < 8 {
                    Some(self.console.input(port))
                } else {
                    None
                }
            }
            CycleType::DataWrite => None,
        }
    }

    fn observe(&mut self, output: &BusOutput) {
        match output.state_code {
            T1_CODE => {
                self.started = true;
                self.address_valid = false;
                self.expect_injection = false;
                if let Some(byte) = output.data {
                    self.address_low = byte;
                }
            }
            T1I_CODE => {
                self.started = true;
                self.address_valid = false;
                self.expect_injection = true;
            }
            T2_CODE => {
                if let Some(byte) = output.data {
                    self.t2_byte = byte;
                    self.cycle_type = CycleType::from_tag(byte >> 6);
                    self.address_high = byte & 0x3f;
                    self.address_valid = true;
                }
            }
            T3_CODE => {
                self.t3_run += 1;
                if self.t3_run == 1 {
                    if let Some(byte) = output.data {
                        self.capture_write(byte);
                    }
                }
            }
            _ => {}
        }
        if output.state_code != T3_CODE {
            self.t3_run = 0;
        }
    }

    fn capture_write(&mut self, byte: u8) {
        match self.cycle_type {
            CycleType::DataWrite => self.memory.set(self.address(), byte),
            CycleType::Io => {
                let port = (self.t2_byte >> 1) & 0b1_1111;
                self.console.output(port, byte);
            }
            // The processor never drives a read transfer; if it did,
            // its own conflict alarm would have fired first.
            _ => {}
        }
    }

    fn address(&self) -> Address {
        Address::from_parts(self.address_high, self.address_low)
    }
}
