//! Wire protocol for PBR Forge
//!
//! Defines the messages exchanged with the texture inference backend
//! (`/generate`, `/health`) and the events reported to the host application.

mod error;
mod messages;
mod types;

pub use error::*;
pub use messages::*;
pub use types::*;
