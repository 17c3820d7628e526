//! Scenario tests for the timing/bus state machine, driven entirely
//! through the external bus protocol.
//!
//! `TestBus` is a scripted collaborator: a flat memory image, eight
//! input ports, an output-port log and an interrupt source which can
//! jam an opcode during an acknowledge cycle.  Like a real
//! collaborator it follows the processor using only the state codes
//! on the bus.  It also polices the single-driver invariant on every
//! half-step: any observed violation is a hard test failure, over and
//! above the alarm the processor itself would raise.

use core::time::Duration;

use base::prelude::*;

use super::timing::{Phase, TimingState};
use super::Processor;
use crate::alarm::Alarm;
use crate::bus::{BusInput, BusOutput, CycleType};
use crate::context::Context;

const T1_CODE: u8 = 0b010;
const T1I_CODE: u8 = 0b110;
const T2_CODE: u8 = 0b100;
const WAIT_CODE: u8 = 0b000;
const T3_CODE: u8 = 0b001;
const STOPPED_CODE: u8 = 0b011;

fn make_ctx() -> Context {
    Context::new(Duration::ZERO, Duration::ZERO)
}

struct TestBus {
    memory: Vec<u8>,
    input_ports: [u8; 8],
    /// (port, value) pairs seen on output ports.
    output_log: Vec<(u8, u8)>,
    /// Log of memory writes as (address, value).
    write_log: Vec<(u16, u8)>,
    /// Opcode the interrupt source jams during an acknowledge cycle.
    inject: Option<u8>,
    wait_request: bool,
    interrupt_request: bool,

    address_low: u8,
    address_high: u8,
    t2_byte: u8,
    cycle_type: CycleType,
    /// True once this cycle's T2 byte has been seen; an acknowledge
    /// cycle never presents one, which is how the memory knows to
    /// stay off the bus.
    address_valid: bool,
    expect_injection: bool,
    t3_run: usize,
    driving: bool,
}

impl TestBus {
    fn new() -> TestBus {
        TestBus {
            memory: vec![0; 0x4000],
            input_ports: [0; 8],
            output_log: Vec::new(),
            write_log: Vec::new(),
            inject: None,
            wait_request: false,
            interrupt_request: false,
            address_low: 0,
            address_high: 0,
            t2_byte: 0,
            cycle_type: CycleType::InstructionFetch,
            address_valid: false,
            expect_injection: false,
            t3_run: 0,
            driving: false,
        }
    }

    fn load(&mut self, at: u16, bytes: &[u8]) {
        let at = usize::from(at);
        self.memory[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn address(&self) -> u16 {
        (u16::from(self.address_high) << 8) | u16::from(self.address_low)
    }

    /// What the collaborators drive during the next half-step.
    fn input(&mut self) -> BusInput {
        let data = self.drive();
        self.driving = data.is_some();
        BusInput {
            data,
            wait_request: self.wait_request,
            interrupt_request: self.interrupt_request,
        }
    }

    fn drive(&self) -> Option<u8> {
        // Collaborators drive only the commit half of a data
        // transfer: the half-step right after the first T3 output of
        // the cycle.
        if self.t3_run != 1 {
            return None;
        }
        if self.expect_injection {
            return self.inject;
        }
        if !self.address_valid {
            return None;
        }
        match self.cycle_type {
            CycleType::InstructionFetch | CycleType::DataRead => {
                Some(self.memory[usize::from(self.address())])
            }
            CycleType::Io => {
                let port = (self.t2_byte >> 1) & 0b1_1111;
                if port < 8 {
                    Some(self.input_ports[usize::from(port)])
                } else {
                    None
                }
            }
            CycleType::DataWrite => None,
        }
    }

    fn observe(&mut self, output: &BusOutput) {
        assert!(
            !(self.driving && output.data.is_some()),
            "bus conflict: collaborator and processor both driving"
        );
        match output.state_code {
            T1_CODE => {
                self.address_valid = false;
                self.expect_injection = false;
                if let Some(byte) = output.data {
                    self.address_low = byte;
                }
            }
            T1I_CODE => {
                assert!(
                    output.data.is_none(),
                    "processor drove the bus during acknowledge address output"
                );
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
            CycleType::DataWrite => {
                let address = self.address();
                self.memory[usize::from(address)] = byte;
                self.write_log.push((address, byte));
            }
            CycleType::Io => {
                let port = (self.t2_byte >> 1) & 0b1_1111;
                assert!(port >= 8, "processor drove data during an input transfer");
                self.output_log.push((port, byte));
            }
            _ => panic!("processor drove data during a read transfer"),
        }
    }
}

fn step(cpu: &mut Processor, bus: &mut TestBus, ctx: &Context) -> Result<BusOutput, Alarm> {
    let input = bus.input();
    let output = cpu.step(ctx, &input)?;
    bus.observe(&output);
    Ok(output)
}

/// A processor already running (past the power-on interrupt dance),
/// about to fetch from `pc`.
fn running_processor(pc: Address) -> Processor {
    let mut cpu = Processor::new();
    cpu.regs.set_pc(pc);
    cpu.state = TimingState::AddressLow;
    cpu.phase = Phase::Setup;
    cpu
}

/// Steps until the current instruction retires, returning how many
/// half-steps it took.  Two half-steps make one timing state.
fn run_one_instruction(cpu: &mut Processor, bus: &mut TestBus, ctx: &Context) -> usize {
    let mut steps = 0;
    loop {
        step(cpu, bus, ctx).expect("unexpected alarm");
        steps += 1;
        if instruction_boundary(cpu, steps) {
            return steps;
        }
        assert!(steps < 100, "instruction failed to complete");
    }
}

fn instruction_boundary(cpu: &Processor, steps: usize) -> bool {
    steps >= 6
        && cpu.cycle_index == 0
        && cpu.phase == Phase::Setup
        && matches!(
            cpu.state,
            TimingState::AddressLow | TimingState::Acknowledge | TimingState::Halted
        )
}

#[test]
fn test_fetch_bus_protocol() {
    // A register move: one five-state cycle.  Check the state-code
    // sequence, the address bytes, the fetch tag and the sync
    // toggling.
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0142, &[0xc1]); // LAB
    let mut cpu = running_processor(addr!(0x0142));

    let mut outputs = Vec::new();
    for _ in 0..10 {
        outputs.push(step(&mut cpu, &mut bus, &ctx).expect("no alarm"));
    }
    let codes: Vec<u8> = outputs.iter().map(|o| o.state_code).collect();
    assert_eq!(
        codes,
        [
            T1_CODE, T1_CODE, T2_CODE, T2_CODE, T3_CODE, T3_CODE, 0b111, 0b111, 0b101, 0b101
        ]
    );
    // T1 presents the low address byte.
    assert_eq!(outputs[0].data, Some(0x42));
    // T2 presents the instruction-fetch tag (00) over the high six
    // address bits.
    assert_eq!(outputs[2].data, Some(0x01));
    // The processor tri-states the read data transfer.
    assert_eq!(outputs[4].data, None);
    // Sync toggles once per half-state.
    for pair in outputs.windows(2) {
        assert_ne!(pair[0].sync, pair[1].sync);
    }
}

#[test]
fn test_scenario_a_add_register() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x81]); // ADB
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.set(RegisterCode::A, 0x05);
    cpu.regs.set(RegisterCode::B, 0x03);

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 10); // five states
    let status = cpu.status();
    assert_eq!(status.a, 0x08);
    assert!(!status.flags.carry);
    assert!(!status.flags.zero);
    assert_eq!(status.pc, addr!(0x0101));
}

#[test]
fn test_scenario_b_restart() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0142, &[0x0d]); // RST 1
    let mut cpu = running_processor(addr!(0x0142));

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 10);
    let status = cpu.status();
    // The return address (one past the restart opcode) stays behind
    // in the old slot; the pointer has moved on by one.
    assert_eq!(status.stack[0], addr!(0x0143));
    assert_eq!(status.stack_pointer, 1);
    assert_eq!(status.pc, addr!(0x0008));
}

#[test]
fn test_scenario_c_conditional_jump_taken() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x60, 0x00, 0x02]); // JTC 0x0200
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.flags.carry = true;

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 22); // eleven states
    assert_eq!(cpu.status().pc, addr!(0x0200));
}

#[test]
fn test_scenario_c_conditional_jump_not_taken() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x60, 0x00, 0x02]); // JTC 0x0200
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.flags.carry = false;

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 18); // nine states: both address bytes consumed
    assert_eq!(cpu.status().pc, addr!(0x0103));
}

#[test]
fn test_scenario_d_acknowledge_waits_for_instruction_boundary() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    // LMI 0x77 through H:L = 0x0200; nine states.
    bus.load(0x0100, &[0x3e, 0x77]);
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.set(RegisterCode::H, 0x02);
    cpu.regs.set(RegisterCode::L, 0x00);

    // Assert the interrupt request part-way into the instruction.
    let mut steps = 0;
    loop {
        if steps == 8 {
            bus.interrupt_request = true;
        }
        let output = step(&mut cpu, &mut bus, &ctx).expect("no alarm");
        steps += 1;
        assert_ne!(
            output.state_code, T1I_CODE,
            "acknowledge must not begin mid-instruction"
        );
        if instruction_boundary(&cpu, steps) {
            break;
        }
    }
    assert_eq!(steps, 18);
    assert_eq!(bus.memory[0x0200], 0x77);
    let resume_pc = cpu.status().pc;
    assert_eq!(resume_pc, addr!(0x0102));

    // The very next cycle is the acknowledge; the interrupt source
    // jams a restart.
    bus.inject = Some(0x0d); // RST 1
    let output = step(&mut cpu, &mut bus, &ctx).expect("no alarm");
    assert_eq!(output.state_code, T1I_CODE);
    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx) + 1;
    assert_eq!(steps, 10);
    let status = cpu.status();
    // The acknowledge fetch does not advance the program counter, so
    // the injected restart pushes the interrupted address.
    assert_eq!(status.stack[0], resume_pc);
    assert_eq!(status.stack_pointer, 1);
    assert_eq!(status.pc, addr!(0x0008));
}

#[test]
fn test_power_on_stopped_until_interrupt() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0000, &[0x06, 0x2a, 0x00]); // LAI 0x2a; HLT
    let mut cpu = Processor::new();

    // Stopped at power-on; stepping goes nowhere.
    for _ in 0..5 {
        let output = step(&mut cpu, &mut bus, &ctx).expect("no alarm");
        assert_eq!(output.state_code, STOPPED_CODE);
    }

    // The front panel raises the interrupt line and jams RST 0.
    bus.interrupt_request = true;
    bus.inject = Some(0x05);
    let output = step(&mut cpu, &mut bus, &ctx).expect("no alarm");
    assert_eq!(output.state_code, STOPPED_CODE);
    bus.interrupt_request = false;

    // Acknowledge cycle, then the restart, then the program runs
    // until the halt.
    let mut saw_t1i = false;
    for _ in 0..60 {
        let output = step(&mut cpu, &mut bus, &ctx).expect("no alarm");
        saw_t1i |= output.state_code == T1I_CODE;
        if cpu.is_halted() {
            break;
        }
    }
    assert!(saw_t1i);
    assert!(cpu.is_halted());
    assert_eq!(cpu.status().a, 0x2a);
}

#[test]
fn test_wait_states_insert_between_t2_and_t3() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0xc0]); // LAA
    let mut cpu = running_processor(addr!(0x0100));
    bus.wait_request = true;

    // T1 and T2 proceed normally.
    let mut outputs = Vec::new();
    for _ in 0..4 {
        outputs.push(step(&mut cpu, &mut bus, &ctx).expect("no alarm"));
    }
    assert_eq!(outputs[3].state_code, T2_CODE);

    // Wait states repeat for as long as the line is held.
    for _ in 0..5 {
        let output = step(&mut cpu, &mut bus, &ctx).expect("no alarm");
        assert_eq!(output.state_code, WAIT_CODE);
    }

    // The release is sampled during a final wait state; the data
    // transfer follows on the next edge and the instruction completes
    // normally.
    bus.wait_request = false;
    let output = step(&mut cpu, &mut bus, &ctx).expect("no alarm");
    assert_eq!(output.state_code, WAIT_CODE);
    let output = step(&mut cpu, &mut bus, &ctx).expect("no alarm");
    assert_eq!(output.state_code, T3_CODE);
    for _ in 0..5 {
        step(&mut cpu, &mut bus, &ctx).expect("no alarm");
    }
    assert_eq!(cpu.status().pc, addr!(0x0101));
}

#[test]
fn test_memory_moves() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    // LBM; LMC
    bus.load(0x0100, &[0xcf, 0xfa]);
    bus.memory[0x0242] = 0x5a;
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.set(RegisterCode::C, 0x99);
    cpu.regs.set(RegisterCode::H, 0x02);
    cpu.regs.set(RegisterCode::L, 0x42);

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 16); // eight states
    assert_eq!(cpu.status().b, 0x5a);

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 16);
    assert_eq!(bus.memory[0x0242], 0x99);
    assert_eq!(bus.write_log, [(0x0242, 0x99)]);
}

#[test]
fn test_alu_memory_and_immediate() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    // ADM; then CPI 0x10
    bus.load(0x0100, &[0x87, 0x3c, 0x10]);
    bus.memory[0x0300] = 0x0e;
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.set(RegisterCode::A, 0x02);
    cpu.regs.set(RegisterCode::H, 0x03);
    cpu.regs.set(RegisterCode::L, 0x00);

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 16);
    assert_eq!(cpu.status().a, 0x10);

    // Compare updates flags but never the accumulator.
    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 16);
    let status = cpu.status();
    assert_eq!(status.a, 0x10);
    assert!(status.flags.zero);
    assert!(!status.flags.carry);
}

#[test]
fn test_input_output() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    // INP 2; OUT 8
    bus.load(0x0100, &[0x45, 0x51]);
    bus.input_ports[2] = 0xab;
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.flags.carry = true;

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 16); // eight states
    let status = cpu.status();
    assert_eq!(status.a, 0xab);
    // Input does not disturb the flags.
    assert!(status.flags.carry);

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 12); // six states
    assert_eq!(bus.output_log, [(8, 0xab)]);
}

#[test]
fn test_call_and_return() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x46, 0x00, 0x02]); // CAL 0x0200
    bus.load(0x0200, &[0x07]); // RET
    let mut cpu = running_processor(addr!(0x0100));

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 22);
    let status = cpu.status();
    assert_eq!(status.pc, addr!(0x0200));
    assert_eq!(status.stack_pointer, 1);
    assert_eq!(status.stack[0], addr!(0x0103));

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 10); // a taken return is five states
    let status = cpu.status();
    assert_eq!(status.pc, addr!(0x0103));
    assert_eq!(status.stack_pointer, 0);
}

#[test]
fn test_conditional_return_not_taken_is_three_states() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x03]); // RFC: return if carry false
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.flags.carry = true;
    cpu.regs.push();
    cpu.regs.set_pc(addr!(0x0100));

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 6);
    let status = cpu.status();
    assert_eq!(status.stack_pointer, 1);
    assert_eq!(status.pc, addr!(0x0101));
}

#[test]
fn test_increment_preserves_carry() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x08, 0x11]); // INB; DCC
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.flags.carry = true;
    cpu.regs.set(RegisterCode::B, 0xff);
    cpu.regs.set(RegisterCode::C, 0x01);

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 10);
    let status = cpu.status();
    assert_eq!(status.b, 0x00);
    // The wrap sets zero but carry is untouched by increment.
    assert!(status.flags.zero);
    assert!(status.flags.carry);

    run_one_instruction(&mut cpu, &mut bus, &ctx);
    let status = cpu.status();
    assert_eq!(status.c, 0x00);
    assert!(status.flags.zero);
    assert!(status.flags.carry);
}

#[test]
fn test_rotate_preserves_result_flags() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x02]); // RLC
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.set(RegisterCode::A, 0x81);
    cpu.regs.flags.zero = true;
    cpu.regs.flags.sign = true;
    cpu.regs.flags.parity = true;

    run_one_instruction(&mut cpu, &mut bus, &ctx);
    let status = cpu.status();
    assert_eq!(status.a, 0x03);
    assert!(status.flags.carry);
    // Rotates touch carry only.
    assert!(status.flags.zero);
    assert!(status.flags.sign);
    assert!(status.flags.parity);
}

#[test]
fn test_undefined_opcode_is_diagnosed_no_op() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x38, 0xc1]); // undefined; LAB
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.set(RegisterCode::B, 0x07);

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 6); // one three-state cycle, then progress resumes
    assert_eq!(cpu.status().pc, addr!(0x0101));

    run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(cpu.status().a, 0x07);
}

#[test]
fn test_illegal_memory_to_memory_move_raises_alarm() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0xff]);
    let mut cpu = running_processor(addr!(0x0100));

    let mut result = Ok(());
    for _ in 0..6 {
        let input = bus.input();
        match cpu.step(&ctx, &input) {
            Ok(output) => bus.observe(&output),
            Err(alarm) => {
                result = Err(alarm);
                break;
            }
        }
    }
    match result {
        Err(Alarm::IllegalInstruction { opcode: 0xff, .. }) => (),
        other => panic!("expected an illegal-instruction alarm, got {other:?}"),
    }
}

#[test]
fn test_bus_conflict_raises_alarm() {
    let ctx = make_ctx();
    let mut cpu = running_processor(addr!(0x0100));
    // A broken collaborator drives the bus while the processor is
    // putting the address out.
    let input = BusInput {
        data: Some(0x55),
        ..BusInput::idle()
    };
    match cpu.step(&ctx, &input) {
        Err(Alarm::BusConflict { .. }) => (),
        other => panic!("expected a bus-conflict alarm, got {other:?}"),
    }
}

#[test]
fn test_undriven_read_raises_alarm() {
    let ctx = make_ctx();
    let mut cpu = running_processor(addr!(0x0100));
    // Nobody drives the fetch data transfer.
    let mut result = Ok(());
    for _ in 0..6 {
        match cpu.step(&ctx, &BusInput::idle()) {
            Ok(_) => (),
            Err(alarm) => {
                result = Err(alarm);
                break;
            }
        }
    }
    match result {
        Err(Alarm::BusUndriven {
            cycle_type: CycleType::InstructionFetch,
            ..
        }) => (),
        other => panic!("expected a bus-undriven alarm, got {other:?}"),
    }
}

#[test]
fn test_jump_unconditional() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x44, 0x42, 0x01]); // JMP 0x0142
    let mut cpu = running_processor(addr!(0x0100));

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 22);
    assert_eq!(cpu.status().pc, addr!(0x0142));
}

#[test]
fn test_move_immediate() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x16, 0x9d]); // LCI 0x9d
    let mut cpu = running_processor(addr!(0x0100));

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 16);
    let status = cpu.status();
    assert_eq!(status.c, 0x9d);
    assert_eq!(status.pc, addr!(0x0102));
}

#[test]
fn test_move_immediate_to_memory() {
    let ctx = make_ctx();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x3e, 0x77]); // LMI 0x77
    let mut cpu = running_processor(addr!(0x0100));
    cpu.regs.set(RegisterCode::H, 0x02);
    cpu.regs.set(RegisterCode::L, 0x00);

    let steps = run_one_instruction(&mut cpu, &mut bus, &ctx);
    assert_eq!(steps, 18); // nine states: fetch, read, write
    assert_eq!(bus.memory[0x0200], 0x77);
    assert_eq!(cpu.status().pc, addr!(0x0102));
}
