//! Domain models for the onco-companion system.

mod conversation;
mod medication;
mod symptom;

pub use conversation::*;
pub use medication::*;
pub use symptom::*;
