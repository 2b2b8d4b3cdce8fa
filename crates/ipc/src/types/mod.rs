//! Type definitions for protocol messages.

mod generation;
mod material;
mod preset;

pub use generation::*;
pub use material::*;
pub use preset::*;
