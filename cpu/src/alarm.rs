//! Alarms raised by the processor core.
//!
//! An alarm is not a recoverable runtime condition: each one means
//! either a program fed the machine an encoding the hardware leaves
//! undefined, or a collaborator (or this implementation) broke the
//! bus protocol.  Execution stops when an alarm is raised; the test
//! harness treats any alarm it did not explicitly expect as a hard
//! failure.
//!
//! Note what is *not* here: unrecognised opcodes.  Those decode to a
//! one-cycle no-op and surface only a diagnostic, preserving forward
//! progress.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use base::prelude::Address;

use crate::bus::CycleType;
use crate::control::timing::TimingState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Alarm {
    /// The one-byte pattern whose source and destination both name
    /// the memory pseudo-register.  The hardware documentation leaves
    /// it undefined; we stop rather than guess.
    IllegalInstruction { opcode: u8, address: Address },

    /// An external collaborator drove the data bus while the
    /// processor was also driving it.  The bus-ownership invariant is
    /// supposed to make this impossible; seeing it means a
    /// correctness bug somewhere on the board.
    BusConflict {
        state: TimingState,
        processor_byte: u8,
        external_byte: u8,
    },

    /// A read-type data-transfer state ended with nobody driving the
    /// bus: the addressed collaborator is missing or miswired.
    BusUndriven {
        cycle_type: CycleType,
        address: Address,
    },
}

impl Display for Alarm {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Alarm::IllegalInstruction { opcode, address } => {
                write!(
                    f,
                    "illegal instruction {opcode:#04x} fetched from {address} (memory-to-memory move is undefined)"
                )
            }
            Alarm::BusConflict {
                state,
                processor_byte,
                external_byte,
            } => {
                write!(
                    f,
                    "bus conflict in state {state:?}: processor driving {processor_byte:#04x} while an external device drives {external_byte:#04x}"
                )
            }
            Alarm::BusUndriven {
                cycle_type,
                address,
            } => {
                write!(
                    f,
                    "nothing drove the bus during the data transfer of a {cycle_type:?} cycle addressing {address}"
                )
            }
        }
    }
}

impl Error for Alarm {}

#[cfg(test)]
mod tests {
    use super::*;
    use base::addr;

    #[test]
    fn test_alarm_display() {
        let a = Alarm::IllegalInstruction {
            opcode: 0xff,
            address: addr!(0x0100),
        };
        assert!(a.to_string().contains("0xff"));
        assert!(a.to_string().contains("0x0100"));
    }
}
