//! The `base` crate defines the things which are useful in both the
//! processor simulator and other associated tools (a disassembler,
//! for example).  The idea is that such a tool would depend on the
//! base crate but would not need to depend on the simulator library
//! itself.

mod types;

pub mod instruction;
pub mod prelude;

pub use crate::types::Address;

#[macro_export]
macro_rules! addr {
    ($n:expr) => {
        $crate::prelude::Address::new($n)
    };
}

#[test]
fn test_addr_macro() {
    use prelude::Address;
    let m: Address = addr!(0x0142);
    let n: Address = Address::from(0x0142_u16);
    assert_eq!(m, n);
}
