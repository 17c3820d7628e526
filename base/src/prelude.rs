//! The prelude exports the structs which are useful in representing
//! things to do with the simulated processor.  Providing this prelude
//! is the main purpose of the base crate.
pub use super::addr;
pub use super::instruction::*;
pub use super::types::*;
