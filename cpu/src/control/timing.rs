//! Timing states and the two-phase step structure.
//!
//! The processor advances through hardware timing states once per
//! primary clock edge.  A machine cycle is T1 (address low out), T2
//! (cycle tag and address high out), an optional run of WAIT states,
//! T3 (data transfer), and for instructions which need extra internal
//! processing the execute-extension states T4 and T5.  Two further
//! states sit outside the normal run: STOPPED (entered by a halt,
//! left only via an interrupt) and T1I, which replaces T1 in the
//! cycle that acknowledges an interrupt.
//!
//! Each state other than WAIT and STOPPED spans two half-steps,
//! modelling the two-phase clocking of the original hardware: the
//! setup half drives the bus, the commit half latches data and
//! applies register, stack and program-counter effects.

use serde::Serialize;

/// One timing state.  The 3-bit codes are the ones the chip presents
/// on its state-code pins, so collaborators can follow along without
/// decoding anything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TimingState {
    /// T1: the low address byte is on the bus.
    AddressLow,
    /// T1I: replaces T1 during an interrupt acknowledge cycle.  The
    /// processor tri-states instead of driving the address.
    Acknowledge,
    /// T2: cycle-type tag and high address bits are on the bus.
    AddressHigh,
    /// Inserted between T2 and T3 while the wait-request line is
    /// asserted.
    Wait,
    /// T3: the data byte crosses the bus, in whichever direction the
    /// cycle type dictates.
    DataTransfer,
    /// The stopped state a halt instruction enters.
    Halted,
    /// T4: first execute-extension state.
    Execute1,
    /// T5: second execute-extension state.
    Execute2,
}

impl TimingState {
    /// The 3-bit state code for the state-code output pins.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            TimingState::AddressLow => 0b010,
            TimingState::Acknowledge => 0b110,
            TimingState::AddressHigh => 0b100,
            TimingState::Wait => 0b000,
            TimingState::DataTransfer => 0b001,
            TimingState::Halted => 0b011,
            TimingState::Execute1 => 0b111,
            TimingState::Execute2 => 0b101,
        }
    }

    /// True for the states which span a setup and a commit half-step.
    /// WAIT and STOPPED are not split: nothing commits in them.
    #[must_use]
    pub fn is_split(&self) -> bool {
        !matches!(self, TimingState::Wait | TimingState::Halted)
    }
}

/// Which half of a split state the next step will perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// First clock phase: bus outputs become valid.
    Setup,
    /// Second clock phase: latches close, registers commit.
    Commit,
}
