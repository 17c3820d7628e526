//! This crate emulates the processor core: the timing/bus state
//! machine, the microcode sequencer, the arithmetic/logic unit, the
//! register file with its eight-level address stack, and the
//! interrupt synchronizer.  Everything else on the bus (memory, I/O
//! ports, the interrupt source) is an external collaborator which
//! talks to the core only through [`BusInput`] and [`BusOutput`].

mod alarm;
mod alu;
mod bus;
mod clock;
mod context;
mod control;
mod interrupt;
mod regs;

pub use alarm::Alarm;
pub use bus::{BusInput, BusOutput, CycleType};
pub use clock::{BasicClock, Clock, HALF_STATE_PERIOD};
pub use context::Context;
pub use control::timing::TimingState;
pub use control::{Processor, ProcessorStatus};
pub use regs::Flags;
