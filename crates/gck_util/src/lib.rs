pub mod bit;
pub mod hex;

pub use bit::{Bit, BitSet};
