//! The RAM collaborator: 16K of byte-wide storage with optional
//! file-backed initialization.
//!
//! This is deliberately dumb.  All the bus-protocol intelligence
//! (address latching, cycle-type decoding, knowing when to drive)
//! lives in the machine wiring; the memory itself only reads and
//! writes cells.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{event, Level};

use base::prelude::Address;

pub const MEMORY_SIZE: usize = 1 << 14;

pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    #[must_use]
    pub fn new() -> Memory {
        Memory {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Loads a raw binary image at `at`, truncating anything that
    /// would run off the top of the address space.  Returns how many
    /// bytes were loaded.
    pub fn load_image(&mut self, path: &Path, at: Address) -> std::io::Result<usize> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;
        let start = usize::from(at);
        let room = MEMORY_SIZE - start;
        if bytes.len() > room {
            event!(
                Level::WARN,
                "image {} is {} bytes but only {} fit at {}; truncating",
                path.display(),
                bytes.len(),
                room,
                at
            );
            bytes.truncate(room);
        }
        self.cells[start..start + bytes.len()].copy_from_slice(&bytes);
        event!(
            Level::INFO,
            "loaded {} bytes from {} at {}",
            bytes.len(),
            path.display(),
            at
        );
        Ok(bytes.len())
    }

    #[must_use]
    pub fn get(&self, address: Address) -> u8 {
        self.cells[usize::from(address)]
    }

    pub fn set(&mut self, address: Address, value: u8) {
        self.cells[usize::from(address)] = value;
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base::addr;

    #[test]
    fn test_get_set() {
        let mut mem = Memory::new();
        mem.set(addr!(0x0142), 0x5a);
        assert_eq!(mem.get(addr!(0x0142)), 0x5a);
        assert_eq!(mem.get(addr!(0x0143)), 0);
    }
}
