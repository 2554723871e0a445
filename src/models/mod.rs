//! Domain models owned by the registries.

pub mod thread;
pub mod turn;
