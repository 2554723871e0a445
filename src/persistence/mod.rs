//! Persistence layer.

pub mod thread_store;
