//! The I/O-port collaborator: a console on one output port.
//!
//! Bytes written to [`CONSOLE_PORT`] appear on standard output;
//! writes to any other port, and reads from unattached input ports,
//! are logged and otherwise ignored.

use std::io::{self, Write};

use tracing::{event, Level};

/// The output port wired to the console.
pub const CONSOLE_PORT: u8 = 8;

pub struct Console {
    out: io::Stdout,
}

impl Console {
    #[must_use]
    pub fn new() -> Console {
        Console { out: io::stdout() }
    }

    /// Handles a byte appearing on an output port.
    pub fn output(&mut self, port: u8, byte: u8) {
        if port == CONSOLE_PORT {
            let mut handle = self.out.lock();
            let _ = handle.write_all(&[byte]);
            let _ = handle.flush();
        } else {
            event!(
                Level::DEBUG,
                "output port {port}: {byte:#04x} (no device attached)"
            );
        }
    }

    /// Supplies the byte an input instruction reads.  No input
    /// devices are attached, so every port reads as zero.
    #[must_use]
    pub fn input(&mut self, port: u8) -> u8 {
        event!(
            Level::DEBUG,
            "input port {port} read with no device attached"
        );
        0
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
