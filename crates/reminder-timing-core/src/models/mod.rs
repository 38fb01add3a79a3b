//! Domain models for reminder timing.

mod policy;
mod reminder;

pub use policy::*;
pub use reminder::*;
